// NSF player - tracker-style shell over the same CPU/APU/bus
//
// The player forces the CPU into the tune's INIT routine with a sentinel
// return address pushed on the stack; an RTS out of INIT leaves PC at
// $0001, which the player treats as a halt state. From then on it jumps to
// PLAY at the header's playback rate the same way, idling the clock
// between calls so the APU keeps streaming samples.

pub mod format;

use std::time::{Duration, Instant};

use crate::cartridge::mappers::{Mapper, NsfRom, Nrom};
use crate::cartridge::{CartInfo, Mirroring, RomError};
use crate::emulator::{
    Emulator, EmulatorConfig, Input, Nes, RamSizeMismatch, SnapshotError,
};
pub use format::{NsfHeader, NsfeExtras};

/// PC value meaning "INIT/PLAY returned, nothing to execute"
const HALT_SENTINEL: u16 = 0x0001;

/// Minimum delay between joypad-driven track changes
const TRACK_CHANGE_DEBOUNCE: Duration = Duration::from_millis(250);

/// Upper bound on INIT execution, in instructions
const INIT_STEP_LIMIT: u64 = 10_000_000;

/// Music playback shell implementing the same `Emulator` seam as the NES
pub struct NsfPlayer {
    nes: Nes,
    header: NsfHeader,
    extras: NsfeExtras,
    play_interval: Duration,
    last_play_call: Instant,
    last_track_change: Instant,
    /// 0-based track index
    current_song: u8,
    /// X register value handed to INIT: 0 NTSC, 1 PAL
    tv_std_bit: u8,
}

impl NsfPlayer {
    /// Build a player from `.nsf` or `.nsfe` bytes
    pub fn new(file: &[u8], config: EmulatorConfig) -> Result<NsfPlayer, RomError> {
        let (header, extras, data) = if file.starts_with(b"NSFE") {
            format::parse_nsfe(file)?
        } else {
            let (header, data) = format::parse_nsf(file)?;
            (header, NsfeExtras::default(), data)
        };

        log::info!("{}", header.song_name);
        log::info!("{}", header.artist_name);
        log::info!("{}", header.copyright_name);
        log::info!("track count: {}", header.num_songs);

        // Lay the tune into a PRG image. Banked tunes pad to the bank
        // offset of the load address; flat tunes sit at their absolute
        // position in the $8000-$FFFF window.
        let (mapper, padding) = if header.uses_banks() {
            (
                Mapper::NsfRom(NsfRom::new(Mirroring::Vertical, true)),
                usize::from(header.load_addr & 0x0FFF),
            )
        } else {
            if header.load_addr < 0x8000 {
                return Err(RomError::BadMusicFile(format!(
                    "load addresses below $8000 are not supported: {:#06x}",
                    header.load_addr
                )));
            }
            (
                Mapper::Nrom(Nrom::new(Mirroring::Vertical, true)),
                usize::from(header.load_addr - 0x8000),
            )
        };

        let mut prg = vec![0u8; padding];
        prg.extend_from_slice(&data);
        // Bank arithmetic expects a power-of-two image
        prg.resize(prg.len().next_power_of_two().max(4 * 1024), 0);

        let tv_std_bit = u8::from(!header.is_ntsc());
        let play_interval = Duration::from_micros(u64::from(header.play_speed_us()));

        let cart = synthetic_cart(&prg, mapper.number());
        let mut player = NsfPlayer {
            nes: Nes::from_parts(cart, mapper, prg, config),
            current_song: header.start_song.saturating_sub(1),
            header,
            extras,
            play_interval,
            last_play_call: Instant::now(),
            last_track_change: Instant::now(),
            tv_std_bit,
        };
        player.init_tune(player.current_song);
        Ok(player)
    }

    /// Reset the machine state and run the tune's INIT routine for a song
    fn init_tune(&mut self, song: u8) {
        let nes = &mut self.nes;
        for addr in 0x0000..0x0800u16 {
            nes.write(addr, 0x00);
        }
        for addr in 0x6000..0x8000u16 {
            nes.write(addr, 0x00);
        }
        for addr in 0x4000..0x4014u16 {
            nes.write(addr, 0x00);
        }
        nes.write(0x4015, 0x0F);
        nes.write(0x4017, 0x40);

        if self.header.uses_banks() {
            for (slot, &bank) in self.header.bank_vals.iter().enumerate() {
                nes.write(0x5FF8 + slot as u16, bank);
            }
        }

        nes.cpu.a = song;
        nes.cpu.x = self.tv_std_bit;

        // Force a RESET-shaped call into INIT: the pushed sentinel makes
        // the routine's RTS land on the halt address
        nes.cpu.s = 0xFD;
        nes.push16(HALT_SENTINEL.wrapping_sub(1));
        nes.cpu.p |= crate::cpu::flags::IRQ_DISABLED;
        nes.cpu.reset = false;
        nes.cpu.pc = self.header.init_addr;

        let mut steps = 0u64;
        while nes.cpu.pc != HALT_SENTINEL {
            nes.step();
            steps += 1;
            if steps >= INIT_STEP_LIMIT {
                log::warn!("tune INIT did not return after {} steps", steps);
                break;
            }
        }
    }

    pub fn header(&self) -> &NsfHeader {
        &self.header
    }

    pub fn track_count(&self) -> u8 {
        self.header.num_songs
    }

    /// 0-based index of the playing track
    pub fn current_track(&self) -> u8 {
        self.current_song
    }

    /// Title of the playing track, when the file carried labels
    pub fn track_label(&self) -> Option<&str> {
        self.extras
            .track_labels
            .get(usize::from(self.current_song))
            .map(String::as_str)
    }

    /// Declared playback time for the current track in milliseconds
    pub fn track_time_ms(&self) -> Option<i32> {
        self.extras.times_ms.get(usize::from(self.current_song)).copied()
    }

    fn change_track(&mut self, delta: i16) {
        let target = i16::from(self.current_song) + delta;
        if (0..i16::from(self.header.num_songs)).contains(&target) {
            self.current_song = target as u8;
            self.init_tune(self.current_song);
        }
    }
}

impl Emulator for NsfPlayer {
    /// Idle at the halt sentinel between PLAY calls so the APU keeps
    /// producing samples at the right rate
    fn step(&mut self) {
        if self.nes.cpu.pc == HALT_SENTINEL
            && self.last_play_call.elapsed() >= self.play_interval
        {
            self.last_play_call = Instant::now();
            self.nes.cpu.s = 0xFD;
            self.nes.push16(HALT_SENTINEL.wrapping_sub(1));
            self.nes.cpu.pc = self.header.play_addr;
        }
        if self.nes.cpu.pc != HALT_SENTINEL {
            self.nes.step();
        } else {
            self.nes.run_cycles(1);
        }
    }

    fn make_snapshot(&mut self) -> Vec<u8> {
        Vec::new()
    }

    fn load_snapshot(&mut self, _data: &[u8]) -> Result<Box<dyn Emulator>, SnapshotError> {
        Err(SnapshotError::Unsupported)
    }

    fn prg_ram(&self) -> Option<&[u8]> {
        None
    }

    fn set_prg_ram(&mut self, _data: &[u8]) -> Result<(), RamSizeMismatch> {
        Ok(())
    }

    fn framebuffer(&self) -> &[u8] {
        self.nes.framebuffer()
    }

    fn flip_requested(&mut self) -> bool {
        self.nes.flip_requested()
    }

    /// Left/Right skip between tracks, debounced against key repeat
    fn update_input(&mut self, input: Input) {
        if self.last_track_change.elapsed() < TRACK_CHANGE_DEBOUNCE {
            return;
        }
        if input.joypad.left {
            self.change_track(-1);
            self.last_track_change = Instant::now();
        } else if input.joypad.right {
            self.change_track(1);
            self.last_track_change = Instant::now();
        }
    }

    fn read_sound_buffer(&mut self, dest: &mut [u8]) -> usize {
        self.nes.read_sound_buffer(dest)
    }
}

/// Fabricate an iNES header for the tune so the core has a `CartInfo`
fn synthetic_cart(prg: &[u8], mapper_number: u32) -> CartInfo {
    let mut header = [0u8; 16];
    header[0..4].copy_from_slice(b"NES\x1A");
    header[4] = prg.len().div_ceil(16 * 1024) as u8;
    header[5] = 0; // CHR-RAM
    header[6] = ((mapper_number as u8) << 4) | 0x01;
    header[7] = (mapper_number as u8) & 0xF0;
    CartInfo::parse(&header).expect("synthesized header is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tune with INIT storing A to $00 and PLAY incrementing $01, both
    /// returning immediately
    fn test_nsf() -> Vec<u8> {
        let mut file = vec![0u8; format::NSF_HEADER_LEN];
        file[0..5].copy_from_slice(b"NESM\x1A");
        file[0x05] = 1;
        file[0x06] = 2; // songs
        file[0x07] = 1; // start song
        file[0x08..0x0A].copy_from_slice(&0x8000u16.to_le_bytes());
        file[0x0A..0x0C].copy_from_slice(&0x8000u16.to_le_bytes()); // INIT
        file[0x0C..0x0E].copy_from_slice(&0x8003u16.to_le_bytes()); // PLAY
        file[0x6E..0x70].copy_from_slice(&16666u16.to_le_bytes());

        // INIT: STA $00 ; RTS   PLAY: INC $01 ; RTS
        file.extend_from_slice(&[0x85, 0x00, 0x60, 0xE6, 0x01, 0x60]);
        file
    }

    fn lax_config() -> EmulatorConfig {
        EmulatorConfig {
            strict_illegal: false,
            strict_io: false,
            ..EmulatorConfig::default()
        }
    }

    #[test]
    fn test_init_runs_to_sentinel() {
        let player = NsfPlayer::new(&test_nsf(), lax_config()).unwrap();
        // INIT received the 0-based song index in A and stored it
        assert_eq!(player.nes.cpu.pc, HALT_SENTINEL);
        assert_eq!(player.current_track(), 0);
    }

    #[test]
    fn test_apu_primed_by_init() {
        let mut player = NsfPlayer::new(&test_nsf(), lax_config()).unwrap();
        // init_tune wrote $4015 = $0F after zeroing the channel registers;
        // the period-high writes loaded each length counter on the way
        assert!(player.nes.apu.pulse1.enabled);
        assert!(player.nes.apu.noise.enabled);
        assert_eq!(player.nes.read(0x4015) & 0x0F, 0x0F);
    }

    #[test]
    fn test_step_idles_at_sentinel() {
        let mut player = NsfPlayer::new(&test_nsf(), lax_config()).unwrap();
        player.last_play_call = Instant::now();
        let cycles = player.nes.cycles();
        player.step();
        // No PLAY due yet: exactly one idle cycle passes
        assert_eq!(player.nes.cycles(), cycles + 1);
        assert_eq!(player.nes.cpu.pc, HALT_SENTINEL);
    }

    #[test]
    fn test_bad_load_addr_rejected() {
        let mut file = test_nsf();
        file[0x08..0x0A].copy_from_slice(&0x6000u16.to_le_bytes());
        assert!(NsfPlayer::new(&file, lax_config()).is_err());
    }

    #[test]
    fn test_track_change_reinits() {
        let mut player = NsfPlayer::new(&test_nsf(), lax_config()).unwrap();
        player.change_track(1);
        assert_eq!(player.current_track(), 1);
        // INIT stored the new song index at $00
        assert_eq!(player.nes.read(0x0000), 1);
        // Below zero and past the last track are clamped
        player.change_track(-5);
        assert_eq!(player.current_track(), 1);
    }
}
