// Snapshot round-trip behavior across the public seam

mod common;

use common::{build_ines, lax_config, machine_with_program, ppu_poke};
use famicore::{Emulator, Nes};

/// A machine rendering a visible background, stepped into mid-frame
fn busy_machine() -> Nes {
    let mut nes = machine_with_program(&[0x4C, 0x00, 0x80]);
    ppu_poke(&mut nes, 0x3F00, 0x0F);
    ppu_poke(&mut nes, 0x3F01, 0x16);
    common::set_ppu_addr(&mut nes, 0x2000);
    let _ = nes.read(0x2002);
    nes.write(0x2005, 0x00);
    nes.write(0x2005, 0x00);
    nes.write(0x2001, 0x0A);

    // Sound too, so the APU state matters
    nes.write(0x4015, 0x01);
    nes.write(0x4000, 0xBF);
    nes.write(0x4002, 0xFD);
    nes.write(0x4003, 0x00);

    for _ in 0..5_000 {
        nes.step();
    }
    nes
}

#[test]
fn round_trip_resumes_bit_identically() {
    let mut original = busy_machine();
    let snapshot = original.make_snapshot();
    assert!(!snapshot.is_empty());

    let mut a = original.load_snapshot_bytes(&snapshot).unwrap();
    let mut b = original.load_snapshot_bytes(&snapshot).unwrap();

    // Identical inputs must give bit-identical video and audio
    let mut sound_a = Vec::new();
    let mut sound_b = Vec::new();
    let mut chunk = [0u8; 4096];
    for _ in 0..40_000 {
        a.step();
        b.step();
        let filled = a.read_sound_buffer(&mut chunk);
        sound_a.extend_from_slice(&chunk[..filled]);
        let filled = b.read_sound_buffer(&mut chunk);
        sound_b.extend_from_slice(&chunk[..filled]);
    }

    assert_eq!(a.cycles(), b.cycles());
    assert_eq!(a.framebuffer(), b.framebuffer());
    assert!(!sound_a.is_empty());
    assert_eq!(sound_a, sound_b);
}

#[test]
fn restored_machine_matches_the_original_going_forward() {
    let mut original = busy_machine();
    let snapshot = original.make_snapshot();
    let mut restored = original.load_snapshot_bytes(&snapshot).unwrap();

    for _ in 0..30_000 {
        original.step();
        restored.step();
    }
    assert_eq!(original.cpu().pc, restored.cpu().pc);
    assert_eq!(original.cycles(), restored.cycles());
    assert_eq!(original.framebuffer(), restored.framebuffer());
}

#[test]
fn chr_ram_rides_in_the_snapshot() {
    // CHR-RAM cart (CHR size 0)
    let rom = build_ines(
        &common::prg_bank_with(&[0xEA], 0x8000, 0x8000, 0x8000),
        &[],
        0x00,
        0x00,
    );
    let mut nes = Nes::new(&rom, lax_config()).unwrap();

    // Scribble into CHR-RAM through the PPU port
    ppu_poke(&mut nes, 0x0123, 0xAB);
    let snapshot = nes.make_snapshot();

    // Wipe it, then restore
    ppu_poke(&mut nes, 0x0123, 0x00);
    let mut restored = nes.load_snapshot_bytes(&snapshot).unwrap();
    assert_eq!(common::ppu_peek(&mut restored, 0x0123), 0xAB);
}

#[test]
fn bad_snapshot_leaves_the_session_alone() {
    let mut nes = busy_machine();
    let pc = nes.cpu().pc;
    assert!(nes.load_snapshot(b"\x1f\x8b garbage").is_err());
    // The failed load did not disturb the running machine
    assert_eq!(nes.cpu().pc, pc);
    nes.step();
}
