// Shared helpers for the integration tests
//
// ROM-based suites synthesize iNES images in memory instead of shipping
// binaries: a 16-byte header, a PRG bank carrying the test program and
// vectors, and a CHR bank with a recognizable pattern.

#![allow(dead_code)]

use famicore::{EmulatorConfig, Nes};

pub const PRG_BANK: usize = 16 * 1024;
pub const CHR_BANK: usize = 8 * 1024;

/// Assemble an iNES image from raw banks
pub fn build_ines(prg: &[u8], chr: &[u8], flags6: u8, flags7: u8) -> Vec<u8> {
    assert!(prg.len() % PRG_BANK == 0 && !prg.is_empty());
    assert!(chr.len() % CHR_BANK == 0);

    let mut rom = Vec::with_capacity(16 + prg.len() + chr.len());
    rom.extend_from_slice(b"NES\x1A");
    rom.push((prg.len() / PRG_BANK) as u8);
    rom.push((chr.len() / CHR_BANK) as u8);
    rom.push(flags6);
    rom.push(flags7);
    rom.extend_from_slice(&[0; 8]);
    rom.extend_from_slice(prg);
    rom.extend_from_slice(chr);
    rom
}

/// One 16KB PRG bank with `program` at $8000 and the supplied vectors
pub fn prg_bank_with(program: &[u8], nmi: u16, reset: u16, irq: u16) -> Vec<u8> {
    let mut prg = vec![0u8; PRG_BANK];
    prg[..program.len()].copy_from_slice(program);
    prg[0x3FFA..0x3FFC].copy_from_slice(&nmi.to_le_bytes());
    prg[0x3FFC..0x3FFE].copy_from_slice(&reset.to_le_bytes());
    prg[0x3FFE..0x4000].copy_from_slice(&irq.to_le_bytes());
    prg
}

/// CHR bank whose tile 0 is solid pixel value 1
pub fn chr_bank_solid_tile0() -> Vec<u8> {
    let mut chr = vec![0u8; CHR_BANK];
    chr[0..8].fill(0xFF); // low plane
    chr
}

/// Permissive config so synthetic programs can poke anywhere
pub fn lax_config() -> EmulatorConfig {
    EmulatorConfig {
        strict_illegal: false,
        strict_io: false,
        ..EmulatorConfig::default()
    }
}

/// NROM machine running `program` from $8000, vectors pointing at $9000
/// (NMI), $8000 (reset), $9000 (IRQ/BRK)
pub fn machine_with_program(program: &[u8]) -> Nes {
    let prg = prg_bank_with(program, 0x9000, 0x8000, 0x9000);
    let rom = build_ines(&prg, &chr_bank_solid_tile0(), 0x00, 0x00);
    Nes::new(&rom, lax_config()).unwrap()
}

/// Write a PPU address through $2006 (resets the latch first)
pub fn set_ppu_addr(nes: &mut Nes, addr: u16) {
    let _ = nes.read(0x2002);
    nes.write(0x2006, (addr >> 8) as u8);
    nes.write(0x2006, addr as u8);
}

/// Write one VRAM byte through the $2006/$2007 port pair
pub fn ppu_poke(nes: &mut Nes, addr: u16, val: u8) {
    set_ppu_addr(nes, addr);
    nes.write(0x2007, val);
}

/// Read one VRAM byte through the port pair, handling the read buffer
pub fn ppu_peek(nes: &mut Nes, addr: u16) -> u8 {
    set_ppu_addr(nes, addr);
    let first = nes.read(0x2007);
    if addr >= 0x3F00 {
        // Palette reads come back unbuffered
        first
    } else {
        nes.read(0x2007)
    }
}
