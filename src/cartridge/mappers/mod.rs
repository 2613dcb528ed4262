// Mappers module - cartridge bank-switching hardware
//
// Every read the CPU makes at $4020-$FFFF and every PPU access below $3000
// goes through the mapper, which routes it into PRG-ROM, PRG-RAM, CHR
// memory, or the internal nametable VRAM. Bank-select state lives here, and
// MMC3 additionally drives a scanline-counter IRQ.
//
// Mappers are modeled as a tagged enum with one variant per iNES mapper
// number. The persisted form is `(number, serialized fields)`; loading a
// snapshot dispatches on the number.

mod mapper0;
mod mapper1;
mod mapper2;
mod mapper3;
mod mapper4;
mod mapper7;
mod mapper31;

use serde::{Deserialize, Serialize};

use super::{CartInfo, Mirroring, RomError};
use crate::bus::Memory;
use crate::cpu::Cpu;
use crate::ppu::Ppu;

pub use mapper0::Nrom;
pub use mapper1::Mmc1;
pub use mapper2::Uxrom;
pub use mapper3::Cnrom;
pub use mapper4::Mmc3;
pub use mapper7::Axrom;
pub use mapper31::NsfRom;

/// Errors raised when restoring a mapper from its persisted form
#[derive(Debug)]
pub enum MapperError {
    /// The snapshot named a mapper number outside the supported set
    UnknownNumber(u32),
    /// The mapper payload did not decode
    BadPayload(serde_json::Error),
}

impl std::fmt::Display for MapperError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapperError::UnknownNumber(num) => {
                write!(f, "state contained unknown mapper number {}", num)
            }
            MapperError::BadPayload(e) => write!(f, "bad mapper payload: {}", e),
        }
    }
}

impl std::error::Error for MapperError {}

impl From<serde_json::Error> for MapperError {
    fn from(e: serde_json::Error) -> Self {
        MapperError::BadPayload(e)
    }
}

/// Persisted mapper form: the mapper number plus its serialized fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapperSnapshot {
    pub number: u32,
    pub data: serde_json::Value,
}

/// Polymorphic cartridge bridge, one variant per supported mapper number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Mapper {
    Nrom(Nrom),
    Mmc1(Mmc1),
    Uxrom(Uxrom),
    Cnrom(Cnrom),
    Mmc3(Mmc3),
    Axrom(Axrom),
    NsfRom(NsfRom),
}

impl Default for Mapper {
    fn default() -> Self {
        Mapper::Nrom(Nrom::new(Mirroring::Horizontal, false))
    }
}

impl Mapper {
    /// Build the mapper named by the cartridge header
    pub fn from_cart(cart: &CartInfo) -> Result<Mapper, RomError> {
        let mirroring = cart.mirroring();
        let chr_is_ram = cart.is_chr_ram();
        match cart.mapper_number() {
            0 => Ok(Mapper::Nrom(Nrom::new(mirroring, chr_is_ram))),
            1 => Ok(Mapper::Mmc1(Mmc1::new(mirroring, chr_is_ram))),
            2 => Ok(Mapper::Uxrom(Uxrom::new(mirroring, chr_is_ram))),
            3 => Ok(Mapper::Cnrom(Cnrom::new(mirroring, chr_is_ram))),
            4 => Ok(Mapper::Mmc3(Mmc3::new(mirroring))),
            7 => Ok(Mapper::Axrom(Axrom::new())),
            31 => Ok(Mapper::NsfRom(NsfRom::new(mirroring, chr_is_ram))),
            num => Err(RomError::UnsupportedMapper(num)),
        }
    }

    /// iNES number of the active variant
    pub fn number(&self) -> u32 {
        match self {
            Mapper::Nrom(_) => 0,
            Mapper::Mmc1(_) => 1,
            Mapper::Uxrom(_) => 2,
            Mapper::Cnrom(_) => 3,
            Mapper::Mmc3(_) => 4,
            Mapper::Axrom(_) => 7,
            Mapper::NsfRom(_) => 31,
        }
    }

    /// One-time setup after the ROM buffers exist
    pub fn init(&mut self, mem: &mut Memory) {
        match self {
            Mapper::Mmc1(m) => m.init(),
            Mapper::Axrom(m) => m.init(),
            Mapper::NsfRom(m) => m.init(mem),
            _ => {}
        }
    }

    pub fn cpu_read(&self, mem: &Memory, addr: u16) -> u8 {
        match self {
            Mapper::Nrom(m) => m.cpu_read(mem, addr),
            Mapper::Mmc1(m) => m.cpu_read(mem, addr),
            Mapper::Uxrom(m) => m.cpu_read(mem, addr),
            Mapper::Cnrom(m) => m.cpu_read(mem, addr),
            Mapper::Mmc3(m) => m.cpu_read(mem, addr),
            Mapper::Axrom(m) => m.cpu_read(mem, addr),
            Mapper::NsfRom(m) => m.cpu_read(mem, addr),
        }
    }

    /// Register writes may acknowledge a pending interrupt, so the CPU
    /// rides along for the MMC3's $E000 IRQ-disable path
    pub fn cpu_write(&mut self, mem: &mut Memory, cpu: &mut Cpu, addr: u16, val: u8) {
        match self {
            Mapper::Nrom(m) => m.cpu_write(mem, addr, val),
            Mapper::Mmc1(m) => m.cpu_write(mem, addr, val),
            Mapper::Uxrom(m) => m.cpu_write(mem, addr, val),
            Mapper::Cnrom(m) => m.cpu_write(mem, addr, val),
            Mapper::Mmc3(m) => m.cpu_write(mem, cpu, addr, val),
            Mapper::Axrom(m) => m.cpu_write(mem, addr, val),
            Mapper::NsfRom(m) => m.cpu_write(mem, addr, val),
        }
    }

    pub fn ppu_read(&self, mem: &Memory, addr: u16) -> u8 {
        match self {
            Mapper::Nrom(m) => m.ppu_read(mem, addr),
            Mapper::Mmc1(m) => m.ppu_read(mem, addr),
            Mapper::Uxrom(m) => m.ppu_read(mem, addr),
            Mapper::Cnrom(m) => m.ppu_read(mem, addr),
            Mapper::Mmc3(m) => m.ppu_read(mem, addr),
            Mapper::Axrom(m) => m.ppu_read(mem, addr),
            Mapper::NsfRom(m) => m.ppu_read(mem, addr),
        }
    }

    pub fn ppu_write(&mut self, mem: &mut Memory, addr: u16, val: u8) {
        match self {
            Mapper::Nrom(m) => m.ppu_write(mem, addr, val),
            Mapper::Mmc1(m) => m.ppu_write(mem, addr, val),
            Mapper::Uxrom(m) => m.ppu_write(mem, addr, val),
            Mapper::Cnrom(m) => m.ppu_write(mem, addr, val),
            Mapper::Mmc3(m) => m.ppu_write(mem, addr, val),
            Mapper::Axrom(m) => m.ppu_write(mem, addr, val),
            Mapper::NsfRom(m) => m.ppu_write(mem, addr, val),
        }
    }

    /// Advance mapper-side counters by one CPU cycle; may raise `cpu.irq`
    pub fn cycle(&mut self, cpu: &mut Cpu, ppu: &Ppu) {
        if let Mapper::Mmc3(m) = self {
            m.cycle(cpu, ppu);
        }
    }

    /// Current nametable mirroring (mutable on MMC1/MMC3/AxROM boards)
    pub fn mirroring(&self) -> Mirroring {
        match self {
            Mapper::Nrom(m) => m.mirroring(),
            Mapper::Mmc1(m) => m.mirroring(),
            Mapper::Uxrom(m) => m.mirroring(),
            Mapper::Cnrom(m) => m.mirroring(),
            Mapper::Mmc3(m) => m.mirroring(),
            Mapper::Axrom(m) => m.mirroring(),
            Mapper::NsfRom(m) => m.mirroring(),
        }
    }

    /// Persisted form for the snapshot envelope
    pub fn to_snapshot(&self) -> MapperSnapshot {
        let data = match self {
            Mapper::Nrom(m) => serde_json::to_value(m),
            Mapper::Mmc1(m) => serde_json::to_value(m),
            Mapper::Uxrom(m) => serde_json::to_value(m),
            Mapper::Cnrom(m) => serde_json::to_value(m),
            Mapper::Mmc3(m) => serde_json::to_value(m),
            Mapper::Axrom(m) => serde_json::to_value(m),
            Mapper::NsfRom(m) => serde_json::to_value(m),
        }
        .expect("mapper state is always representable as JSON");
        MapperSnapshot {
            number: self.number(),
            data,
        }
    }

    /// Rebuild a mapper from its persisted form
    pub fn from_snapshot(snap: &MapperSnapshot) -> Result<Mapper, MapperError> {
        let data = snap.data.clone();
        Ok(match snap.number {
            0 => Mapper::Nrom(serde_json::from_value(data)?),
            1 => Mapper::Mmc1(serde_json::from_value(data)?),
            2 => Mapper::Uxrom(serde_json::from_value(data)?),
            3 => Mapper::Cnrom(serde_json::from_value(data)?),
            4 => Mapper::Mmc3(serde_json::from_value(data)?),
            7 => Mapper::Axrom(serde_json::from_value(data)?),
            31 => Mapper::NsfRom(serde_json::from_value(data)?),
            num => return Err(MapperError::UnknownNumber(num)),
        })
    }
}

// Nametable address translation. The 4KB nametable window collapses onto
// the console's 2KB of internal VRAM according to the active mirroring.

fn vert_mirror_addr(addr: u16) -> u16 {
    (addr - 0x2000) & 0x07FF
}

fn horiz_mirror_addr(addr: u16) -> u16 {
    if addr < 0x2800 {
        (addr & 0x23FF) - 0x2000
    } else {
        (addr & 0x2BFF) - 0x2400
    }
}

fn one_screen_lower_addr(addr: u16) -> u16 {
    (addr - 0x2000) & 0x03FF
}

fn one_screen_upper_addr(addr: u16) -> u16 {
    ((addr - 0x2000) & 0x03FF) + 0x0400
}

fn nametable_index(mirroring: Mirroring, addr: u16) -> u16 {
    match mirroring {
        Mirroring::Vertical => vert_mirror_addr(addr),
        Mirroring::Horizontal => horiz_mirror_addr(addr),
        Mirroring::OneScreenLower => one_screen_lower_addr(addr),
        Mirroring::OneScreenUpper => one_screen_upper_addr(addr),
        // Four-screen boards carry their own VRAM; none of the in-tree
        // mappers wire it up, so fall back to the vertical arrangement.
        Mirroring::FourScreen => vert_mirror_addr(addr),
    }
}

pub(crate) fn nametable_read(mem: &Memory, mirroring: Mirroring, addr: u16) -> u8 {
    mem.vram[nametable_index(mirroring, addr) as usize]
}

pub(crate) fn nametable_write(mem: &mut Memory, mirroring: Mirroring, addr: u16, val: u8) {
    mem.vram[nametable_index(mirroring, addr) as usize] = val;
}
