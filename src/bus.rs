// Bus module - CPU address-space decoding
//
// Routes every CPU read and write across the 64KB address space into
// internal RAM, the PPU register file, APU/IO registers, OAM-DMA, the
// controller ports, or the mapper.
//
// # NES Memory Map (CPU Address Space)
//
// ```text
// $0000-$07FF: 2KB internal RAM
// $0800-$1FFF: mirrors of RAM (3 times)
// $2000-$2007: PPU registers
// $2008-$3FFF: mirrors of PPU registers (repeating every 8 bytes)
// $4000-$4017: APU and I/O registers
// $4018-$401F: CPU test mode, unused on retail hardware
// $4020-$FFFF: cartridge space (PRG-ROM, PRG-RAM, mapper registers)
// ```

use serde::{Deserialize, Serialize};

use crate::emulator::Nes;

/// RAM, VRAM, and cartridge buffers shared between the bus and the mapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Memory {
    /// 2KB internal RAM, mirrored four times across $0000-$1FFF
    pub internal_ram: Vec<u8>,
    /// 2KB internal nametable VRAM, reached only through mapper mirroring
    pub vram: Vec<u8>,
    /// PRG-ROM image (not serialized; reattached on snapshot load)
    #[serde(skip)]
    pub prg_rom: Vec<u8>,
    /// CHR-ROM or CHR-RAM (not serialized here; CHR-RAM rides in the
    /// snapshot envelope instead)
    #[serde(skip)]
    pub chr: Vec<u8>,
    /// Battery-backable work RAM at $6000-$7FFF
    pub prg_ram: Vec<u8>,
}

impl Memory {
    pub fn ram(&self) -> &[u8] {
        &self.internal_ram
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory {
            internal_ram: vec![0; 0x0800],
            vram: vec![0; 0x0800],
            prg_rom: Vec::new(),
            chr: Vec::new(),
            prg_ram: Vec::new(),
        }
    }
}

impl Nes {
    /// Read a byte from the CPU bus
    pub fn read(&mut self, addr: u16) -> u8 {
        match addr {
            // Internal RAM, mirrored every $0800
            0x0000..=0x1FFF => self.mem.internal_ram[usize::from(addr & 0x07FF)],

            // PPU registers, mirrored every 8 bytes
            0x2000..=0x3FFF => self.ppu_register_read(addr & 0x0007),

            // APU control registers are write-only
            0x4000..=0x4013 => 0xFF,

            // OAM-DMA register is write-only
            0x4014 => 0xFF,

            0x4015 => self.apu_read_status(),

            0x4016 => self.read_joypad_reg1(),
            0x4017 => self.read_joypad_reg2(),

            // CPU test mode, unused on retail hardware
            0x4018..=0x401F => {
                if self.config.strict_io {
                    panic!("CPU test mode not implemented, read at {:04x}", addr);
                }
                0xFF
            }

            // Cartridge space
            0x4020..=0xFFFF => self.mapper.cpu_read(&self.mem, addr),
        }
    }

    /// Write a byte to the CPU bus
    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x1FFF => self.mem.internal_ram[usize::from(addr & 0x07FF)] = val,

            0x2000..=0x3FFF => self.ppu_register_write(addr & 0x0007, val),

            0x4000..=0x4013 => self.apu_register_write(addr, val),

            0x4014 => self.oam_dma(val),

            0x4015 => self.apu_write_status(val),

            0x4016 => self.write_joypad_reg1(val),

            // Writes to $4017 program the APU frame counter; the controller
            // port only answers reads here
            0x4017 => self.apu_write_frame_counter(val),

            0x4018..=0x401F => {
                if self.config.strict_io {
                    panic!("CPU test mode not implemented, write({:04x}, {:02x})", addr, val);
                }
            }

            0x4020..=0xFFFF => {
                self.mapper
                    .cpu_write(&mut self.mem, &mut self.cpu, addr, val)
            }
        }
    }

    /// Two successive 8-bit reads, low byte first
    pub fn read16(&mut self, addr: u16) -> u16 {
        let low = u16::from(self.read(addr));
        let high = u16::from(self.read(addr.wrapping_add(1)));
        (high << 8) | low
    }

    /// Two successive 8-bit writes, low byte first
    pub fn write16(&mut self, addr: u16, val: u16) {
        self.write(addr, val as u8);
        self.write(addr.wrapping_add(1), (val >> 8) as u8);
    }

    /// OAM-DMA: copy 256 bytes from page `base << 8` into OAM via $2004.
    ///
    /// The CPU is suspended for the duration, but the clock keeps running:
    /// one setup cycle, one alignment cycle when starting on an odd CPU
    /// cycle, then a read/write cycle pair per byte - 513 or 514 in total.
    fn oam_dma(&mut self, base: u8) {
        self.run_cycles(1);
        if self.cycles % 2 == 1 {
            self.run_cycles(1);
        }
        let mut addr = u16::from(base) << 8;
        for _ in 0..256 {
            let val = self.read(addr);
            self.run_cycles(1);
            self.write(0x2004, val);
            self.run_cycles(1);
            addr = addr.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cartridge::CartInfo;
    use crate::emulator::{EmulatorConfig, Nes};

    fn test_nes() -> Nes {
        let mut header = [0u8; 16];
        header[0..4].copy_from_slice(b"NES\x1A");
        header[4] = 1;
        let cart = CartInfo::parse(&header).unwrap();
        let config = EmulatorConfig {
            strict_illegal: false,
            strict_io: false,
            ..EmulatorConfig::default()
        };
        Nes::from_parts(cart, Default::default(), vec![0; 16 * 1024], config)
    }

    #[test]
    fn test_ram_mirrors_every_0800() {
        let mut nes = test_nes();
        nes.write(0x0123, 0xAB);
        assert_eq!(nes.read(0x0123), 0xAB);
        assert_eq!(nes.read(0x0923), 0xAB);
        assert_eq!(nes.read(0x1123), 0xAB);
        assert_eq!(nes.read(0x1923), 0xAB);

        // Writes through a mirror land in the base RAM
        nes.write(0x1FFF, 0x55);
        assert_eq!(nes.read(0x07FF), 0x55);
    }

    #[test]
    fn test_read16_is_little_endian() {
        let mut nes = test_nes();
        nes.write(0x0000, 0x34);
        nes.write(0x0001, 0x12);
        assert_eq!(nes.read16(0x0000), 0x1234);
    }

    #[test]
    fn test_write16_low_byte_first() {
        let mut nes = test_nes();
        nes.write16(0x0100, 0xBEEF);
        assert_eq!(nes.read(0x0100), 0xEF);
        assert_eq!(nes.read(0x0101), 0xBE);
    }

    #[test]
    fn test_apu_control_regs_are_write_only() {
        let mut nes = test_nes();
        nes.write(0x4000, 0xBF);
        assert_eq!(nes.read(0x4000), 0xFF);
        assert_eq!(nes.read(0x4014), 0xFF);
    }

    #[test]
    fn test_cpu_test_mode_reads_open_bus_when_lax() {
        let mut nes = test_nes();
        assert_eq!(nes.read(0x4018), 0xFF);
        assert_eq!(nes.read(0x401F), 0xFF);
    }

    #[test]
    fn test_ppu_registers_mirror_every_eight_bytes() {
        let mut nes = test_nes();
        // OAMADDR + OAMDATA through a deep mirror
        nes.write(0x3FF3, 0x05); // $2003
        nes.write(0x3FF4, 0x77); // $2004
        nes.write(0x2003, 0x05);
        assert_eq!(nes.read(0x2004), 0x77);
    }

    #[test]
    fn test_oam_dma_cycle_cost_alignment() {
        // Even-cycle start costs 513; odd-cycle start costs 514
        let mut nes = test_nes();
        let before = nes.cycles();
        nes.write(0x4014, 0x02);
        assert_eq!(nes.cycles() - before, 513);

        let mut nes = test_nes();
        nes.run_cycles(1);
        let before = nes.cycles();
        nes.write(0x4014, 0x02);
        assert_eq!(nes.cycles() - before, 514);
    }
}
