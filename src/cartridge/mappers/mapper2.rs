// Mapper 2 (UxROM) - switchable 16KB PRG window, fixed top bank
//
// Memory Layout:
// - CPU $8000-$BFFF: switchable 16KB PRG-ROM bank
// - CPU $C000-$FFFF: fixed last 16KB PRG-ROM bank
// - PPU $0000-$1FFF: 8KB CHR-RAM

use serde::{Deserialize, Serialize};

use super::{nametable_read, nametable_write};
use crate::bus::Memory;
use crate::cartridge::Mirroring;

/// Mapper 2 implementation (UxROM)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Uxrom {
    vram_mirroring: Mirroring,
    prg_bank_number: usize,
    is_chr_ram: bool,
}

impl Uxrom {
    pub fn new(mirroring: Mirroring, is_chr_ram: bool) -> Self {
        Uxrom {
            vram_mirroring: mirroring,
            prg_bank_number: 0,
            is_chr_ram,
        }
    }

    pub fn mirroring(&self) -> Mirroring {
        self.vram_mirroring
    }

    pub fn cpu_read(&self, mem: &Memory, addr: u16) -> u8 {
        if (0x6000..0x8000).contains(&addr) {
            return mem.prg_ram[(addr as usize - 0x6000) & (mem.prg_ram.len() - 1)];
        }
        if (0x8000..0xC000).contains(&addr) {
            return mem.prg_rom[self.prg_bank_number * 16 * 1024 + (addr as usize - 0x8000)];
        }
        if addr >= 0xC000 {
            return mem.prg_rom[(mem.prg_rom.len() - 16 * 1024) + (addr as usize - 0xC000)];
        }
        0xFF
    }

    pub fn cpu_write(&mut self, mem: &mut Memory, addr: u16, val: u8) {
        if (0x6000..0x8000).contains(&addr) {
            let real = (addr as usize - 0x6000) & (mem.prg_ram.len() - 1);
            mem.prg_ram[real] = val;
        }
        if addr >= 0x8000 {
            self.prg_bank_number = usize::from(val) & (mem.prg_rom.len() / (16 * 1024) - 1);
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
            if self.is_chr_ram {
                mem.chr[addr as usize] = val;
            }
        } else {
            nametable_write(mem, self.vram_mirroring, addr, val);
        }
    }
}
