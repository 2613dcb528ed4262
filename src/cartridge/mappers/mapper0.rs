// Mapper 0 (NROM) - no bank switching at all
//
// Memory Layout:
// - CPU $6000-$7FFF: PRG-RAM (when fitted)
// - CPU $8000-$FFFF: 16KB or 32KB PRG-ROM, smaller boards mirror
// - PPU $0000-$1FFF: fixed 8KB CHR-ROM or CHR-RAM

use serde::{Deserialize, Serialize};

use super::{nametable_read, nametable_write};
use crate::bus::Memory;
use crate::cartridge::Mirroring;

/// Mapper 0 implementation (NROM)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Nrom {
    vram_mirroring: Mirroring,
    is_chr_ram: bool,
}

impl Nrom {
    pub fn new(mirroring: Mirroring, is_chr_ram: bool) -> Self {
        Nrom {
            vram_mirroring: mirroring,
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
        if addr >= 0x8000 {
            return mem.prg_rom[(addr as usize - 0x8000) & (mem.prg_rom.len() - 1)];
        }
        0xFF
    }

    pub fn cpu_write(&mut self, mem: &mut Memory, addr: u16, val: u8) {
        if (0x6000..0x8000).contains(&addr) {
            let real = (addr as usize - 0x6000) & (mem.prg_ram.len() - 1);
            mem.prg_ram[real] = val;
        }
        // $8000 and up is ROM: writes are ignored
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
