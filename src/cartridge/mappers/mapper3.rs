// Mapper 3 (CNROM) - fixed PRG, switchable 8KB CHR bank
//
// Memory Layout:
// - CPU $8000-$FFFF: 16KB or 32KB PRG-ROM, smaller boards mirror
// - PPU $0000-$1FFF: switchable 8KB CHR-ROM bank

use serde::{Deserialize, Serialize};

use super::{nametable_read, nametable_write};
use crate::bus::Memory;
use crate::cartridge::Mirroring;

/// Mapper 3 implementation (CNROM)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Cnrom {
    vram_mirroring: Mirroring,
    is_chr_ram: bool,
    chr_bank_number: usize,
}

impl Cnrom {
    pub fn new(mirroring: Mirroring, is_chr_ram: bool) -> Self {
        Cnrom {
            vram_mirroring: mirroring,
            is_chr_ram,
            chr_bank_number: 0,
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
        if addr >= 0x8000 {
            self.chr_bank_number = usize::from(val) & (mem.chr.len() / (8 * 1024) - 1);
        }
    }

    fn chr_index(&self, addr: u16) -> usize {
        self.chr_bank_number * 8 * 1024 + addr as usize
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
            if self.is_chr_ram {
                let real = self.chr_index(addr);
                mem.chr[real] = val;
            }
        } else {
            nametable_write(mem, self.vram_mirroring, addr, val);
        }
    }
}
