// Mapper 7 (AxROM) - 32KB PRG banks with one-screen mirroring select
//
// Memory Layout:
// - CPU $8000-$FFFF: switchable 32KB PRG-ROM bank
// - PPU $0000-$1FFF: 8KB CHR-RAM
//
// Writes to $8000-$FFFF select the PRG bank (bits 0-2) and which half of
// VRAM the single nametable screen uses (bit 4). No PRG-RAM on this board.

use serde::{Deserialize, Serialize};

use super::{nametable_read, nametable_write};
use crate::bus::Memory;
use crate::cartridge::Mirroring;

/// Mapper 7 implementation (AxROM)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Axrom {
    vram_mirroring: Mirroring,
    prg_bank_number: usize,
}

impl Axrom {
    pub fn new() -> Self {
        Axrom {
            vram_mirroring: Mirroring::OneScreenLower,
            prg_bank_number: 0,
        }
    }

    pub fn init(&mut self) {
        self.vram_mirroring = Mirroring::OneScreenLower;
    }

    pub fn mirroring(&self) -> Mirroring {
        self.vram_mirroring
    }

    pub fn cpu_read(&self, mem: &Memory, addr: u16) -> u8 {
        if (0x6000..0x8000).contains(&addr) {
            // no PRG-RAM on this board
            return 0xFF;
        }
        if addr >= 0x8000 {
            let offset = self.prg_bank_number * 32 * 1024;
            return mem.prg_rom[offset + (addr as usize - 0x8000)];
        }
        0xFF
    }

    pub fn cpu_write(&mut self, mem: &mut Memory, addr: u16, val: u8) {
        if addr >= 0x8000 {
            self.prg_bank_number =
                usize::from(val & 0x07) & (mem.prg_rom.len() / (32 * 1024) - 1);
            self.vram_mirroring = if val & 0x10 != 0 {
                Mirroring::OneScreenUpper
            } else {
                Mirroring::OneScreenLower
            };
        }
    }

    pub fn ppu_read(&self, mem: &Memory, addr: u16) -> u8 {
        if addr < 0x2000 {
            mem.chr[addr as usize]
        } else {
            nametable_read(mem, self.vram_mirroring, addr)
        }
    }

    pub fn ppu_write(&mut self, mem: &mut Memory, addr: u16, val: u8) {
        if addr < 0x2000 {
            mem.chr[addr as usize] = val;
        } else {
            nametable_write(mem, self.vram_mirroring, addr, val);
        }
    }
}

impl Default for Axrom {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_and_mirroring_select() {
        let mut mem = Memory {
            prg_rom: (0..128 * 1024).map(|i| (i / (32 * 1024)) as u8).collect(),
            chr: vec![0; 8 * 1024],
            prg_ram: vec![0; 8 * 1024],
            ..Memory::default()
        };
        let mut m = Axrom::new();
        assert_eq!(m.mirroring(), Mirroring::OneScreenLower);

        m.cpu_write(&mut mem, 0x8000, 0x12);
        assert_eq!(m.cpu_read(&mem, 0x8000), 2);
        assert_eq!(m.mirroring(), Mirroring::OneScreenUpper);
    }

    #[test]
    fn test_no_prg_ram() {
        let mut mem = Memory {
            prg_rom: vec![0; 32 * 1024],
            chr: vec![0; 8 * 1024],
            prg_ram: vec![0; 8 * 1024],
            ..Memory::default()
        };
        let mut m = Axrom::new();
        m.cpu_write(&mut mem, 0x6000, 0x42);
        assert_eq!(m.cpu_read(&mem, 0x6000), 0xFF);
    }
}
