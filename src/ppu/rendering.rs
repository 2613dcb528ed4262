// Per-dot rendering state machine
//
// Each scanline is 341 dots. Background tiles move through a four-fetch
// pipeline (nametable, attribute, pattern low, pattern high) into 16-bit
// shift registers; sprites are evaluated into secondary OAM at dot 257 for
// the following line. Scroll bits of v advance as rendering walks the
// nametables: coarse X every 8 dots, Y at dot 256, horizontal bits copied
// back from t at dot 257, vertical bits during dots 280-304 of the
// pre-render line.

use super::palette;
use crate::emulator::Nes;

impl Nes {
    /// Advance the PPU by one dot
    pub(crate) fn ppu_step(&mut self) {
        self.ppu.vblank_just_set = false;

        let line = self.ppu.scanline;
        let dot = self.ppu.dot;
        let rendering = self.ppu.rendering_enabled();

        if line == -1 && dot == 1 {
            self.ppu.vblank_alert = false;
            self.ppu.sprite_zero_hit = false;
            self.ppu.sprite_overflow = false;
        }

        if rendering && (line == -1 || line < 240) {
            self.background_pipeline(line, dot);

            if dot == 256 {
                self.increment_y();
            }
            if dot == 257 {
                self.copy_horizontal_bits();
            }
            if line == -1 && (280..=304).contains(&dot) {
                self.copy_vertical_bits();
            }
            // Evaluate sprites for the line about to be rendered
            if dot == 257 && line < 239 {
                self.evaluate_sprites(line + 1);
            }
        }

        if (0..240).contains(&line) && (1..=256).contains(&dot) {
            self.render_pixel(dot - 1, line as u32);
        }

        if line == 241 && dot == 1 {
            self.ppu.vblank_alert = true;
            self.ppu.vblank_just_set = true;
            self.ppu.flip_requested = true;
            if self.ppu.nmi_enabled() {
                self.cpu.nmi = true;
            }
        }

        // Advance the dot and scanline counters
        self.ppu.dot += 1;
        if self.ppu.dot > 340 {
            self.ppu.dot = 0;
            self.ppu.scanline += 1;
            if self.ppu.scanline > 260 {
                self.ppu.scanline = -1;
                self.ppu.frame += 1;
                // Odd frames drop the first dot of the pre-render line
                // while rendering is on
                if self.ppu.frame % 2 == 1 && self.ppu.rendering_enabled() {
                    self.ppu.dot = 1;
                }
            }
        }
    }

    /// Shift registers and tile fetches for dots 1-256 and 321-336
    fn background_pipeline(&mut self, _line: i32, dot: u32) {
        if (2..=257).contains(&dot) || (322..=337).contains(&dot) {
            self.ppu.bg_pattern_shift_low <<= 1;
            self.ppu.bg_pattern_shift_high <<= 1;
            self.ppu.bg_attr_shift_low <<= 1;
            self.ppu.bg_attr_shift_high <<= 1;
        }

        if (1..=256).contains(&dot) || (321..=336).contains(&dot) {
            match (dot - 1) % 8 {
                0 => {
                    self.reload_background_shifters();
                    let addr = 0x2000 | (self.ppu.v & 0x0FFF);
                    self.ppu.bg_nt_latch = self.vram_read(addr);
                }
                2 => {
                    let v = self.ppu.v;
                    let addr = 0x23C0
                        | (v & 0x0C00)
                        | ((v >> 4) & 0x38)
                        | ((v >> 2) & 0x07);
                    let attr = self.vram_read(addr);
                    // Pick the 2-bit selector for this tile's quadrant
                    let shift = ((v >> 4) & 0x04) | (v & 0x02);
                    self.ppu.bg_attr_latch = (attr >> shift) & 0x03;
                }
                4 => {
                    let addr = self.bg_pattern_addr();
                    self.ppu.bg_pattern_low_latch = self.vram_read(addr);
                }
                6 => {
                    let addr = self.bg_pattern_addr() + 8;
                    self.ppu.bg_pattern_high_latch = self.vram_read(addr);
                }
                7 => self.increment_coarse_x(),
                _ => {}
            }
        }

        if dot == 257 {
            self.reload_background_shifters();
        }
    }

    fn bg_pattern_addr(&self) -> u16 {
        let base = if self.ppu.ctrl & 0x10 != 0 { 0x1000 } else { 0 };
        let fine_y = (self.ppu.v >> 12) & 0x07;
        base + u16::from(self.ppu.bg_nt_latch) * 16 + fine_y
    }

    fn reload_background_shifters(&mut self) {
        let ppu = &mut self.ppu;
        ppu.bg_pattern_shift_low =
            (ppu.bg_pattern_shift_low & 0xFF00) | u16::from(ppu.bg_pattern_low_latch);
        ppu.bg_pattern_shift_high =
            (ppu.bg_pattern_shift_high & 0xFF00) | u16::from(ppu.bg_pattern_high_latch);
        let low = if ppu.bg_attr_latch & 0x01 != 0 { 0xFF } else { 0x00 };
        let high = if ppu.bg_attr_latch & 0x02 != 0 { 0xFF } else { 0x00 };
        ppu.bg_attr_shift_low = (ppu.bg_attr_shift_low & 0xFF00) | low;
        ppu.bg_attr_shift_high = (ppu.bg_attr_shift_high & 0xFF00) | high;
    }

    /// Coarse X rolls over into the horizontal nametable bit
    fn increment_coarse_x(&mut self) {
        if self.ppu.v & 0x001F == 31 {
            self.ppu.v &= !0x001F;
            self.ppu.v ^= 0x0400;
        } else {
            self.ppu.v += 1;
        }
    }

    /// Fine Y carries into coarse Y; row 29 wraps and toggles the vertical
    /// nametable, row 31 wraps without the toggle
    fn increment_y(&mut self) {
        if self.ppu.v & 0x7000 != 0x7000 {
            self.ppu.v += 0x1000;
        } else {
            self.ppu.v &= !0x7000;
            let mut y = (self.ppu.v >> 5) & 0x001F;
            if y == 29 {
                y = 0;
                self.ppu.v ^= 0x0800;
            } else if y == 31 {
                y = 0;
            } else {
                y += 1;
            }
            self.ppu.v = (self.ppu.v & !0x03E0) | (y << 5);
        }
    }

    fn copy_horizontal_bits(&mut self) {
        self.ppu.v = (self.ppu.v & !0x041F) | (self.ppu.t & 0x041F);
    }

    fn copy_vertical_bits(&mut self) {
        self.ppu.v = (self.ppu.v & !0x7BE0) | (self.ppu.t & 0x7BE0);
    }

    /// Scan primary OAM for sprites in range of `line`, filling secondary
    /// OAM with up to eight pattern rows. More than eight raises the
    /// overflow flag (simplified: no hardware scan bug).
    fn evaluate_sprites(&mut self, line: i32) {
        let height = i32::from(self.ppu.sprite_height());
        self.ppu.sprite_count = 0;

        for index in 0..64usize {
            let oam_y = i32::from(self.ppu.oam[index * 4]);
            let row = line - 1 - oam_y;
            if !(0..height).contains(&row) {
                continue;
            }
            if self.ppu.sprite_count == 8 {
                self.ppu.sprite_overflow = true;
                break;
            }

            let tile = self.ppu.oam[index * 4 + 1];
            let attr = self.ppu.oam[index * 4 + 2];
            let x = self.ppu.oam[index * 4 + 3];

            let flip_v = attr & 0x80 != 0;
            let flip_h = attr & 0x40 != 0;
            let mut row = (if flip_v { height - 1 - row } else { row }) as u16;

            let addr = if height == 16 {
                // 8x16: pattern table from tile bit 0, bottom half in the
                // next tile
                let base = u16::from(tile & 0x01) * 0x1000;
                let mut tile16 = u16::from(tile & 0xFE);
                if row >= 8 {
                    tile16 += 1;
                    row -= 8;
                }
                base + tile16 * 16 + row
            } else {
                let base = if self.ppu.ctrl & 0x08 != 0 { 0x1000 } else { 0 };
                base + u16::from(tile) * 16 + row
            };

            let mut pattern_low = self.vram_read(addr);
            let mut pattern_high = self.vram_read(addr + 8);
            if flip_h {
                pattern_low = pattern_low.reverse_bits();
                pattern_high = pattern_high.reverse_bits();
            }

            let slot = usize::from(self.ppu.sprite_count);
            self.ppu.sprite_x[slot] = x;
            self.ppu.sprite_attr[slot] = attr;
            self.ppu.sprite_pattern_low[slot] = pattern_low;
            self.ppu.sprite_pattern_high[slot] = pattern_high;
            self.ppu.sprite_is_zero[slot] = index == 0;
            self.ppu.sprite_count += 1;
        }
    }

    /// Compose the background and sprite pixels at (x, y) and write RGBA
    fn render_pixel(&mut self, x: u32, y: u32) {
        let ppu = &self.ppu;

        // Background pixel from the shift registers
        let mut bg_pix = 0u8;
        let mut bg_pal = 0u8;
        if ppu.show_bg() && (x >= 8 || ppu.mask & 0x02 != 0) {
            let bit = 0x8000u16 >> ppu.fine_x;
            bg_pix = (u8::from(ppu.bg_pattern_shift_high & bit != 0) << 1)
                | u8::from(ppu.bg_pattern_shift_low & bit != 0);
            bg_pal = (u8::from(ppu.bg_attr_shift_high & bit != 0) << 1)
                | u8::from(ppu.bg_attr_shift_low & bit != 0);
        }

        // First opaque sprite pixel in OAM order wins
        let mut sp_pix = 0u8;
        let mut sp_pal = 0u8;
        let mut sp_behind = false;
        let mut sp_is_zero = false;
        if ppu.show_sprites() && (x >= 8 || ppu.mask & 0x04 != 0) {
            for slot in 0..usize::from(ppu.sprite_count) {
                let sx = u32::from(ppu.sprite_x[slot]);
                if x < sx || x >= sx + 8 {
                    continue;
                }
                let col = (x - sx) as u8;
                let pix = (u8::from(ppu.sprite_pattern_high[slot] & (0x80 >> col) != 0) << 1)
                    | u8::from(ppu.sprite_pattern_low[slot] & (0x80 >> col) != 0);
                if pix == 0 {
                    continue;
                }
                sp_pix = pix;
                sp_pal = ppu.sprite_attr[slot] & 0x03;
                sp_behind = ppu.sprite_attr[slot] & 0x20 != 0;
                sp_is_zero = ppu.sprite_is_zero[slot];
                break;
            }
        }

        if sp_is_zero && sp_pix != 0 && bg_pix != 0 && x != 255 {
            self.ppu.sprite_zero_hit = true;
        }

        // Priority mux: transparent pixels fall through to the universal
        // background color
        let palette_addr = if bg_pix == 0 && sp_pix == 0 {
            0x3F00
        } else if sp_pix != 0 && (bg_pix == 0 || !sp_behind) {
            0x3F10 + u16::from(sp_pal) * 4 + u16::from(sp_pix)
        } else {
            0x3F00 + u16::from(bg_pal) * 4 + u16::from(bg_pix)
        };

        let mut color = self.ppu.palette_read(palette_addr);
        if self.ppu.mask & 0x01 != 0 {
            color &= 0x30; // grayscale
        }
        let emphasis = self.ppu.mask >> 5;
        let rgba = palette::rgba(color, emphasis);

        let offset = (y as usize * super::SCREEN_WIDTH + x as usize) * 4;
        self.ppu.framebuffer[offset..offset + 4].copy_from_slice(&rgba);
    }
}
