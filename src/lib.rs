// famicore - a cycle-stepped NES/Famicom emulator core
//
// The machine is an owning aggregate: `Nes` holds the CPU, PPU, APU,
// memory, and mapper by value, and every CPU cycle advances the PPU by
// three dots, the APU by one cycle, and the mapper by one cycle. The host
// drives any playable machine (cartridge, NSF tune, or the error screen)
// through the `Emulator` trait.

// Public modules
pub mod apu;
#[cfg(feature = "audio")]
pub mod audio;
pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod display;
pub mod emulator;
pub mod input;
pub mod nsf;
pub mod ppu;

// Re-export main types for convenience
pub use apu::Apu;
#[cfg(feature = "audio")]
pub use audio::AudioOutput;
pub use bus::Memory;
pub use cartridge::{CartInfo, Mapper, MapperError, Mirroring, RomError};
pub use cpu::Cpu;
pub use display::WindowConfig;
pub use emulator::{
    Emulator, EmulatorConfig, ErrorScreen, Input, Nes, RamSizeMismatch, SnapshotError,
};
pub use input::Joypad;
pub use nsf::NsfPlayer;
pub use ppu::{Ppu, FRAME_BYTES, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Boot any supported image: iNES cartridges, NSF/NSFE tunes, or the
/// error screen when the file cannot be handled
pub fn boot(file: &[u8], config: EmulatorConfig) -> Box<dyn Emulator> {
    if file.len() >= 4 && (&file[0..4] == b"NESM" || &file[0..4] == b"NSFE") {
        match NsfPlayer::new(file, config) {
            Ok(player) => Box::new(player),
            Err(e) => Box::new(ErrorScreen::new(e.to_string())),
        }
    } else {
        match Nes::new(file, config) {
            Ok(nes) => Box::new(nes),
            Err(e) => Box::new(ErrorScreen::new(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_falls_back_to_error_screen() {
        let emu = boot(b"garbage", EmulatorConfig::default());
        // The error screen renders its backdrop instead of crashing
        assert_eq!(emu.framebuffer().len(), FRAME_BYTES);
    }
}
