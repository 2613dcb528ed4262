// Cartridge module - iNES header parsing and mapper implementations
//
// A cartridge image starts with a 16-byte iNES header, optionally followed
// by a 512-byte trainer, then PRG-ROM and CHR-ROM. The header describes the
// ROM geometry and which mapper circuit the board carries.
//
// # iNES Header Layout
//
// ```text
// Byte 0-3: Magic "NES\x1A"
// Byte 4:   PRG-ROM size in 16KB units
// Byte 5:   CHR-ROM size in 8KB units (0 means the board has CHR-RAM)
// Byte 6:   Mirroring (bit 0), battery (bit 1), trainer (bit 2),
//           four-screen (bit 3), mapper low nybble (bits 4-7)
// Byte 7:   NES 2.0 signature (bits 2-3 == 10), mapper high nybble
// Byte 8:   PRG-RAM size in 8KB units (0 means 8KB)
// ```

pub mod mappers;

use serde::{Deserialize, Serialize};

pub use mappers::{Mapper, MapperError};

/// Errors produced while classifying a ROM image
#[derive(Debug)]
pub enum RomError {
    /// File shorter than the 16-byte header
    TooShort,
    /// Header magic is not "NES\x1A"
    BadMagic,
    /// The header names a mapper that is not in the supported set
    UnsupportedMapper(u32),
    /// NSF/NSFE specific failure (bad version, chip flags, chunk layout)
    BadMusicFile(String),
}

impl std::fmt::Display for RomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RomError::TooShort => write!(f, "rom file too short"),
            RomError::BadMagic => write!(f, "unknown rom file format"),
            RomError::UnsupportedMapper(num) => {
                write!(f, "unimplemented mapper number {}", num)
            }
            RomError::BadMusicFile(msg) => write!(f, "bad music file: {}", msg),
        }
    }
}

impl std::error::Error for RomError {}

/// Nametable mirroring arrangement
///
/// Maps the 4KB nametable address range onto the console's 2KB of internal
/// VRAM. The one-screen modes only appear on mapper-controlled boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
    OneScreenLower,
    OneScreenUpper,
}

/// Parsed iNES header, immutable after construction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CartInfo {
    prg_rom_size_code: u8,
    chr_rom_size_code: u8,
    flags6: u8,
    flags7: u8,
    // iNES 1.0 only
    prg_ram_size_code: u8,
    is_nes2: bool,
}

impl CartInfo {
    /// Parse the 16-byte iNES header at the start of `rom`
    pub fn parse(rom: &[u8]) -> Result<CartInfo, RomError> {
        if rom.len() < 16 {
            return Err(RomError::TooShort);
        }
        if &rom[0..3] != b"NES" || rom[3] != 0x1A {
            return Err(RomError::BadMagic);
        }

        let is_nes2 = rom[7] & 0xC0 == 0x80;
        Ok(CartInfo {
            prg_rom_size_code: rom[4],
            chr_rom_size_code: rom[5],
            flags6: rom[6],
            flags7: rom[7],
            prg_ram_size_code: if is_nes2 { 0 } else { rom[8] },
            is_nes2,
        })
    }

    /// Mapper number, assembled from the nybbles of flag bytes 6 and 7
    pub fn mapper_number(&self) -> u32 {
        u32::from((self.flags7 & 0xF0) | (self.flags6 >> 4))
    }

    /// Static mirroring arrangement from the header
    pub fn mirroring(&self) -> Mirroring {
        if self.flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if self.flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }

    /// True if the board has battery-backed PRG-RAM worth persisting
    pub fn has_battery_backed_ram(&self) -> bool {
        self.flags6 & 0x02 != 0
    }

    /// True if a 512-byte trainer sits between the header and PRG-ROM
    pub fn has_trainer(&self) -> bool {
        self.flags6 & 0x04 != 0
    }

    pub fn is_nes2(&self) -> bool {
        self.is_nes2
    }

    /// PRG-ROM size in bytes
    pub fn prg_rom_size(&self) -> usize {
        usize::from(self.prg_rom_size_code) * 16 * 1024
    }

    /// CHR-ROM size in bytes (zero means the board has CHR-RAM)
    pub fn chr_rom_size(&self) -> usize {
        usize::from(self.chr_rom_size_code) * 8 * 1024
    }

    /// True if the board uses CHR-RAM instead of CHR-ROM
    pub fn is_chr_ram(&self) -> bool {
        self.chr_rom_size_code == 0
    }

    /// CHR-RAM size in bytes (8KB when present)
    pub fn chr_ram_size(&self) -> usize {
        if self.is_chr_ram() {
            8 * 1024
        } else {
            0
        }
    }

    /// PRG-RAM size in bytes; a size code of zero means the 8KB default
    pub fn prg_ram_size(&self) -> usize {
        if self.prg_ram_size_code == 0 {
            8 * 1024
        } else {
            usize::from(self.prg_ram_size_code) * 8 * 1024
        }
    }

    /// Offset of PRG-ROM within the image (header plus optional trainer)
    pub fn prg_rom_offset(&self) -> usize {
        if self.has_trainer() {
            16 + 512
        } else {
            16
        }
    }

    /// Offset of CHR-ROM within the image
    pub fn chr_rom_offset(&self) -> usize {
        self.prg_rom_offset() + self.prg_rom_size()
    }
}
