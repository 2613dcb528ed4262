// Mapper behavior through the full machine

mod common;

use common::{build_ines, chr_bank_solid_tile0, lax_config, ppu_peek, ppu_poke, PRG_BANK};
use famicore::{Nes, RomError};

/// 128KB PRG image whose banks are stamped with their own index,
/// with reset/IRQ vectors in the last bank
fn stamped_prg(banks: usize) -> Vec<u8> {
    let mut prg = vec![0u8; banks * PRG_BANK];
    for bank in 0..banks {
        prg[bank * PRG_BANK] = bank as u8;
    }
    let last = (banks - 1) * PRG_BANK;
    prg[last + 0x3FFC..last + 0x3FFE].copy_from_slice(&0x8000u16.to_le_bytes());
    prg
}

#[test]
fn unsupported_mapper_is_rejected_at_construction() {
    // Mapper 66 is outside the in-tree set
    let rom = build_ines(&stamped_prg(1), &chr_bank_solid_tile0(), 0x20, 0x40);
    assert!(matches!(
        Nes::new(&rom, lax_config()),
        Err(RomError::UnsupportedMapper(66))
    ));
}

#[test]
fn mmc1_serial_write_sets_mirroring_and_prg_mode() {
    let rom = build_ines(&stamped_prg(8), &chr_bank_solid_tile0(), 0x10, 0x00);
    let mut nes = Nes::new(&rom, lax_config()).unwrap();

    // Serially write $0E to the control register: vertical mirroring,
    // last PRG bank fixed
    for bit in 0..5 {
        nes.write(0x8000, (0x0E >> bit) & 0x01);
    }

    // Vertical mirroring is observable through the nametables
    ppu_poke(&mut nes, 0x2000, 0x77);
    assert_eq!(ppu_peek(&mut nes, 0x2800), 0x77);

    // Last-bank-fixed: $C000 shows the final bank, $8000 the selected one
    assert_eq!(nes.read(0xC000), 7);
    for bit in 0..5 {
        nes.write(0xE000, (0x03 >> bit) & 0x01);
    }
    assert_eq!(nes.read(0x8000), 3);
    assert_eq!(nes.read(0xC000), 7);
}

#[test]
fn uxrom_switches_the_low_window_only() {
    let rom = build_ines(&stamped_prg(8), &chr_bank_solid_tile0(), 0x21, 0x00);
    let mut nes = Nes::new(&rom, lax_config()).unwrap();

    assert_eq!(nes.read(0xC000), 7);
    nes.write(0x8000, 5);
    assert_eq!(nes.read(0x8000), 5);
    assert_eq!(nes.read(0xC000), 7);
}

#[test]
fn cnrom_switches_chr_banks() {
    let mut chr = vec![0u8; 4 * common::CHR_BANK];
    for bank in 0..4 {
        chr[bank * common::CHR_BANK] = 0x10 + bank as u8;
    }
    let rom = build_ines(&stamped_prg(2), &chr, 0x30, 0x00);
    let mut nes = Nes::new(&rom, lax_config()).unwrap();

    assert_eq!(ppu_peek(&mut nes, 0x0000), 0x10);
    nes.write(0x8000, 2);
    assert_eq!(ppu_peek(&mut nes, 0x0000), 0x12);
}

#[test]
fn axrom_selects_32kb_banks_and_one_screen_mirroring() {
    // 4 x 32KB banks; vectors live per-bank so just stamp bank starts
    let mut prg = vec![0u8; 8 * PRG_BANK];
    for bank in 0..4 {
        prg[bank * 2 * PRG_BANK] = 0x40 + bank as u8;
    }
    let rom = build_ines(&prg, &chr_bank_solid_tile0(), 0x70, 0x00);
    let mut nes = Nes::new(&rom, lax_config()).unwrap();

    assert_eq!(nes.read(0x8000), 0x40);
    nes.write(0x8000, 0x02);
    assert_eq!(nes.read(0x8000), 0x42);

    // One-screen mirroring: all four nametables alias one screen
    ppu_poke(&mut nes, 0x2000, 0x33);
    assert_eq!(ppu_peek(&mut nes, 0x2400), 0x33);
    assert_eq!(ppu_peek(&mut nes, 0x2C00), 0x33);
}

#[test]
fn mmc3_fixed_and_switchable_windows() {
    // 128KB PRG = 16 x 8KB banks for MMC3
    let mut prg = vec![0u8; 8 * PRG_BANK];
    for bank in 0..16 {
        prg[bank * 8 * 1024] = bank as u8;
    }
    let last = prg.len() - PRG_BANK;
    prg[last + 0x3FFC..last + 0x3FFE].copy_from_slice(&0x8000u16.to_le_bytes());

    let mut chr = vec![0u8; 16 * common::CHR_BANK];
    for kb in 0..128 {
        chr[kb * 1024] = kb as u8;
    }

    let rom = build_ines(&prg, &chr, 0x40, 0x00);
    let mut nes = Nes::new(&rom, lax_config()).unwrap();

    // Fixed windows: last bank at $E000, second-to-last at $C000
    assert_eq!(nes.read(0xE000), 15);
    assert_eq!(nes.read(0xC000), 14);

    // Switch slot 6 ($8000 window) to bank 3
    nes.write(0x8000, 0x06);
    nes.write(0x8001, 0x03);
    assert_eq!(nes.read(0x8000), 3);

    // Switch a 1KB CHR slot and observe it through the PPU port
    nes.write(0x8000, 0x02);
    nes.write(0x8001, 9);
    assert_eq!(ppu_peek(&mut nes, 0x1000), 9);
}

#[test]
fn snapshot_rejects_mapper_mismatch() {
    use famicore::Emulator;

    let rom_nrom = build_ines(&stamped_prg(1), &chr_bank_solid_tile0(), 0x00, 0x00);
    let rom_mmc1 = build_ines(&stamped_prg(8), &chr_bank_solid_tile0(), 0x10, 0x00);
    let mut nrom = Nes::new(&rom_nrom, lax_config()).unwrap();
    let mmc1 = Nes::new(&rom_mmc1, lax_config()).unwrap();

    let snap = nrom.make_snapshot();
    assert!(mmc1.load_snapshot_bytes(&snap).is_err());
}
