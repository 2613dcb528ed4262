// Mapper 4 (MMC3) - eight bank slots plus a scanline-counter IRQ
//
// Memory Layout:
// - CPU $6000-$7FFF: 8KB PRG-RAM
// - CPU $8000-$9FFF: switchable 8KB PRG bank (or fixed second-to-last)
// - CPU $A000-$BFFF: switchable 8KB PRG bank
// - CPU $C000-$DFFF: fixed second-to-last bank (or the $8000 switch bank)
// - CPU $E000-$FFFF: fixed last 8KB PRG bank
// - PPU: two 2KB + four 1KB CHR banks, halves swappable by the CHR mode bit
//
// Register Interface (address bit 0 selects even/odd register):
// - $8000 even: bank select (CHR mode bit 7, PRG mode bit 6, slot bits 0-2)
// - $8001 odd:  bank data for the selected slot
// - $A000 even: mirroring
// - $C000 even: IRQ counter reload value; $C001 odd: request reload
// - $E000 even: clear pending IRQ and disable; $E001 odd: enable
//
// The IRQ counter is clocked once per visible scanline near the end of the
// rendered line, approximating the PPU A12 edge detector.

use serde::{Deserialize, Serialize};

use super::{nametable_read, nametable_write};
use crate::bus::Memory;
use crate::cartridge::Mirroring;
use crate::cpu::Cpu;
use crate::ppu::Ppu;

/// Dot on which a visible scanline's IRQ clock fires
const END_OF_SCANLINE_DOT: i32 = 260;

/// Mapper 4 implementation (MMC3)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Mmc3 {
    vram_mirroring: Mirroring,

    bank_write_selector: u8,
    prg_lower_bank_is_locked: bool,
    prg_bank0_number: usize,
    prg_bank1_number: usize,

    chr_upper_banks_are_bigger: bool,
    chr_bank_numbers: [usize; 6],

    irq_last_ppu_dot: i32,
    irq_counter: u8,
    irq_counter_reload_value: u8,
    irq_counter_reload_requested: bool,
    irq_enabled: bool,
}

impl Mmc3 {
    pub fn new(mirroring: Mirroring) -> Self {
        Mmc3 {
            vram_mirroring: mirroring,
            bank_write_selector: 0,
            prg_lower_bank_is_locked: false,
            prg_bank0_number: 0,
            prg_bank1_number: 0,
            chr_upper_banks_are_bigger: false,
            chr_bank_numbers: [0; 6],
            irq_last_ppu_dot: 0,
            irq_counter: 0,
            irq_counter_reload_value: 0,
            irq_counter_reload_requested: false,
            irq_enabled: false,
        }
    }

    pub fn mirroring(&self) -> Mirroring {
        self.vram_mirroring
    }

    /// Clock the scanline IRQ counter. Fires once per rendered scanline when
    /// the dot counter crosses the end-of-line trigger point.
    pub fn cycle(&mut self, cpu: &mut Cpu, ppu: &Ppu) {
        let is_rendering = ppu.show_bg() && ppu.scanline() >= -1 && ppu.scanline() < 240;
        let dot = ppu.dot() as i32;
        if is_rendering && self.irq_last_ppu_dot < END_OF_SCANLINE_DOT && dot >= END_OF_SCANLINE_DOT
        {
            if self.irq_counter_reload_requested {
                self.irq_counter_reload_requested = false;
                self.irq_counter = self.irq_counter_reload_value;
            }
            if self.irq_counter == 0 {
                if self.irq_enabled {
                    cpu.irq = true;
                }
                self.irq_counter = self.irq_counter_reload_value;
            } else {
                self.irq_counter -= 1;
            }
        }
        self.irq_last_ppu_dot = dot;
    }

    pub fn cpu_read(&self, mem: &Memory, addr: u16) -> u8 {
        if (0x6000..0x8000).contains(&addr) {
            return mem.prg_ram[(addr as usize - 0x6000) & (mem.prg_ram.len() - 1)];
        }
        if (0x8000..0xA000).contains(&addr) {
            if self.prg_lower_bank_is_locked {
                let offset = mem.prg_rom.len() - 2 * 8 * 1024; // second to last bank
                return mem.prg_rom[offset + (addr as usize - 0x8000)];
            }
            return mem.prg_rom[8 * 1024 * self.prg_bank0_number + (addr as usize - 0x8000)];
        }
        if (0xA000..0xC000).contains(&addr) {
            return mem.prg_rom[8 * 1024 * self.prg_bank1_number + (addr as usize - 0xA000)];
        }
        if (0xC000..0xE000).contains(&addr) {
            if self.prg_lower_bank_is_locked {
                return mem.prg_rom[8 * 1024 * self.prg_bank0_number + (addr as usize - 0xC000)];
            }
            let offset = mem.prg_rom.len() - 2 * 8 * 1024; // second to last bank
            return mem.prg_rom[offset + (addr as usize - 0xC000)];
        }
        // $E000 and up: last bank, always fixed
        let offset = mem.prg_rom.len() - 8 * 1024;
        mem.prg_rom[offset + (addr as usize - 0xE000)]
    }

    pub fn cpu_write(&mut self, mem: &mut Memory, cpu: &mut Cpu, addr: u16, val: u8) {
        if (0x6000..0x8000).contains(&addr) {
            let real = (addr as usize - 0x6000) & (mem.prg_ram.len() - 1);
            mem.prg_ram[real] = val;
        }
        if (0x8000..0xA000).contains(&addr) {
            if addr & 0x01 == 0 {
                self.chr_upper_banks_are_bigger = val & 0x80 != 0;
                self.prg_lower_bank_is_locked = val & 0x40 != 0;
                // MMC6 has a RAM enable bit here; ignored for compatibility
                self.bank_write_selector = val & 0x07;
            } else {
                let selector = usize::from(self.bank_write_selector);
                if selector < 6 {
                    self.chr_bank_numbers[selector] =
                        usize::from(val) & (mem.chr.len() / 1024 - 1);
                } else {
                    let bank = usize::from(val) & (mem.prg_rom.len() / (8 * 1024) - 1);
                    if selector == 6 {
                        self.prg_bank0_number = bank;
                    } else {
                        self.prg_bank1_number = bank;
                    }
                }
            }
        }
        if (0xA000..0xC000).contains(&addr) {
            if addr & 0x01 == 0 {
                self.vram_mirroring = if val & 0x01 == 0 {
                    Mirroring::Vertical
                } else {
                    Mirroring::Horizontal
                };
            }
            // Odd register is RAM protect; ignored for MMC3/MMC6 compatibility
        }
        if (0xC000..0xE000).contains(&addr) {
            if addr & 0x01 == 0 {
                self.irq_counter_reload_value = val;
            } else {
                self.irq_counter_reload_requested = true;
            }
        }
        if addr >= 0xE000 {
            if addr & 0x01 == 0 {
                // The even register acknowledges: any pending IRQ is
                // withdrawn along with the disable
                self.irq_enabled = false;
                cpu.irq = false;
            } else {
                self.irq_enabled = true;
            }
        }
    }

    /// Resolve a pattern-table address to a CHR offset. The 2KB banks take
    /// the lower half unless the CHR mode bit swaps the layout.
    fn chr_index(&self, addr: u16) -> usize {
        let region = (addr >> 10) as usize; // 1KB regions 0..8
        let offset_in_region = (addr & 0x03FF) as usize;
        let big = self.chr_upper_banks_are_bigger;
        let bank = match region {
            0 => {
                if big {
                    self.chr_bank_numbers[2]
                } else {
                    self.chr_bank_numbers[0] & !0x01
                }
            }
            1 => {
                if big {
                    self.chr_bank_numbers[3]
                } else {
                    self.chr_bank_numbers[0] | 0x01
                }
            }
            2 => {
                if big {
                    self.chr_bank_numbers[4]
                } else {
                    self.chr_bank_numbers[1] & !0x01
                }
            }
            3 => {
                if big {
                    self.chr_bank_numbers[5]
                } else {
                    self.chr_bank_numbers[1] | 0x01
                }
            }
            4 => {
                if big {
                    self.chr_bank_numbers[0] & !0x01
                } else {
                    self.chr_bank_numbers[2]
                }
            }
            5 => {
                if big {
                    self.chr_bank_numbers[0] | 0x01
                } else {
                    self.chr_bank_numbers[3]
                }
            }
            6 => {
                if big {
                    self.chr_bank_numbers[1] & !0x01
                } else {
                    self.chr_bank_numbers[4]
                }
            }
            _ => {
                if big {
                    self.chr_bank_numbers[1] | 0x01
                } else {
                    self.chr_bank_numbers[5]
                }
            }
        };
        bank * 1024 + offset_in_region
    }

    pub fn ppu_read(&self, mem: &Memory, addr: u16) -> u8 {
        if addr < 0x2000 {
            mem.chr[self.chr_index(addr)]
        } else {
            nametable_read(mem, self.vram_mirroring, addr)
        }
    }

    pub fn ppu_write(&mut self, mem: &mut Memory, addr: u16, val: u8) {
        if addr < 0x2000 {
            let real = self.chr_index(addr);
            mem.chr[real] = val;
        } else {
            nametable_write(mem, self.vram_mirroring, addr, val);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Memory {
        Memory {
            prg_rom: (0..128 * 1024).map(|i| (i / (8 * 1024)) as u8).collect(),
            chr: (0..128 * 1024).map(|i| (i / 1024) as u8).collect(),
            prg_ram: vec![0; 8 * 1024],
            ..Memory::default()
        }
    }

    fn select_bank(m: &mut Mmc3, mem: &mut Memory, cpu: &mut Cpu, slot: u8, bank: u8) {
        m.cpu_write(mem, cpu, 0x8000, slot);
        m.cpu_write(mem, cpu, 0x8001, bank);
    }

    #[test]
    fn test_fixed_banks() {
        let mem = memory();
        let m = Mmc3::new(Mirroring::Horizontal);
        // Last bank at $E000, second-to-last at $C000 in the default mode
        assert_eq!(m.cpu_read(&mem, 0xE000), 15);
        assert_eq!(m.cpu_read(&mem, 0xC000), 14);
    }

    #[test]
    fn test_prg_bank_switching() {
        let mut mem = memory();
        let mut cpu = Cpu::new();
        let mut m = Mmc3::new(Mirroring::Horizontal);

        select_bank(&mut m, &mut mem, &mut cpu, 6, 3);
        select_bank(&mut m, &mut mem, &mut cpu, 7, 5);
        assert_eq!(m.cpu_read(&mem, 0x8000), 3);
        assert_eq!(m.cpu_read(&mem, 0xA000), 5);
    }

    #[test]
    fn test_prg_mode_swaps_windows() {
        let mut mem = memory();
        let mut cpu = Cpu::new();
        let mut m = Mmc3::new(Mirroring::Horizontal);

        select_bank(&mut m, &mut mem, &mut cpu, 6, 3);
        // Set the PRG mode bit: $8000 locks to second-to-last, $C000 switches
        m.cpu_write(&mut mem, &mut cpu, 0x8000, 0x46);
        assert_eq!(m.cpu_read(&mem, 0x8000), 14);
        assert_eq!(m.cpu_read(&mem, 0xC000), 3);
    }

    #[test]
    fn test_chr_2kb_banks_ignore_low_bit() {
        let mut mem = memory();
        let mut cpu = Cpu::new();
        let mut m = Mmc3::new(Mirroring::Horizontal);

        select_bank(&mut m, &mut mem, &mut cpu, 0, 5);
        // 2KB slot: low bit dropped, so regions 0 and 1 map banks 4 and 5
        assert_eq!(m.ppu_read(&mem, 0x0000), 4);
        assert_eq!(m.ppu_read(&mem, 0x0400), 5);
    }

    #[test]
    fn test_chr_mode_swaps_halves() {
        let mut mem = memory();
        let mut cpu = Cpu::new();
        let mut m = Mmc3::new(Mirroring::Horizontal);

        select_bank(&mut m, &mut mem, &mut cpu, 2, 9);
        // CHR mode bit moves the 1KB banks into the lower half
        m.cpu_write(&mut mem, &mut cpu, 0x8000, 0x80);
        assert_eq!(m.ppu_read(&mem, 0x0000), 9);
    }

    #[test]
    fn test_mirroring_register() {
        let mut mem = memory();
        let mut cpu = Cpu::new();
        let mut m = Mmc3::new(Mirroring::Horizontal);

        m.cpu_write(&mut mem, &mut cpu, 0xA000, 0x00);
        assert_eq!(m.mirroring(), Mirroring::Vertical);
        m.cpu_write(&mut mem, &mut cpu, 0xA000, 0x01);
        assert_eq!(m.mirroring(), Mirroring::Horizontal);
    }

    #[test]
    fn test_irq_fires_after_counted_scanlines() {
        let mut mem = memory();
        let mut m = Mmc3::new(Mirroring::Horizontal);
        let mut cpu = Cpu::new();
        let mut ppu = Ppu::new();
        ppu.mask = 0x08; // background on

        m.cpu_write(&mut mem, &mut cpu, 0xC000, 1); // reload value
        m.cpu_write(&mut mem, &mut cpu, 0xC001, 0); // request reload
        m.cpu_write(&mut mem, &mut cpu, 0xE001, 0); // enable

        // Sweep the dot counter across the trigger point three times:
        // reload (1), decrement to 0, then fire.
        ppu.scanline = 10;
        for _ in 0..3 {
            ppu.dot = 0;
            m.cycle(&mut cpu, &ppu);
            ppu.dot = 300;
            m.cycle(&mut cpu, &ppu);
        }
        assert!(cpu.irq);
    }

    #[test]
    fn test_irq_disable_write() {
        let mut mem = memory();
        let mut cpu = Cpu::new();
        let mut m = Mmc3::new(Mirroring::Horizontal);
        m.cpu_write(&mut mem, &mut cpu, 0xE001, 0);
        assert!(m.irq_enabled);
        m.cpu_write(&mut mem, &mut cpu, 0xE000, 0);
        assert!(!m.irq_enabled);
    }

    #[test]
    fn test_even_write_withdraws_pending_irq() {
        let mut mem = memory();
        let mut m = Mmc3::new(Mirroring::Horizontal);
        let mut cpu = Cpu::new();
        let mut ppu = Ppu::new();
        ppu.mask = 0x08;

        // Run the counter until the mapper asserts the IRQ line
        m.cpu_write(&mut mem, &mut cpu, 0xC000, 0);
        m.cpu_write(&mut mem, &mut cpu, 0xC001, 0);
        m.cpu_write(&mut mem, &mut cpu, 0xE001, 0);
        ppu.scanline = 10;
        for _ in 0..2 {
            ppu.dot = 0;
            m.cycle(&mut cpu, &ppu);
            ppu.dot = 300;
            m.cycle(&mut cpu, &ppu);
        }
        assert!(cpu.irq);

        // $E000 acknowledges: the pending line drops with the disable
        m.cpu_write(&mut mem, &mut cpu, 0xE000, 0);
        assert!(!cpu.irq);
        assert!(!m.irq_enabled);
    }
}
