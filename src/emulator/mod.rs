// Emulator module - the owning aggregate and its public seam
//
// `Nes` owns every subsystem by value: CPU registers, PPU, APU, the memory
// buffers, and the mapper. Subsystem operations that need the shared bus
// are methods on `Nes` itself, which models the real hardware's single
// address bus without pointer cycles.
//
// The host talks to any playable machine (cartridge, NSF player, or the
// error screen) through the `Emulator` trait.

mod config;
mod error_screen;
mod snapshot;

pub use config::EmulatorConfig;
pub use error_screen::ErrorScreen;
pub use snapshot::SnapshotError;

use serde::{Deserialize, Serialize};

use crate::apu::Apu;
use crate::bus::Memory;
use crate::cartridge::{CartInfo, Mapper, RomError};
use crate::cpu::Cpu;
use crate::input::{Controllers, Joypad};
use crate::ppu::Ppu;

/// Everything the host sends into a running emulator
#[derive(Debug, Clone, Copy, Default)]
pub struct Input {
    pub joypad: Joypad,
}

/// Attempted to restore PRG-RAM from a buffer of the wrong size
#[derive(Debug)]
pub struct RamSizeMismatch {
    pub expected: usize,
    pub got: usize,
}

impl std::fmt::Display for RamSizeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ram size mismatch: expected {} bytes, got {}",
            self.expected, self.got
        )
    }
}

impl std::error::Error for RamSizeMismatch {}

/// The public face of an emulation session
pub trait Emulator {
    /// Run one CPU instruction (and everything clocked off it)
    fn step(&mut self);

    /// Serialize the machine; empty when snapshots are unsupported
    fn make_snapshot(&mut self) -> Vec<u8>;

    /// Build a replacement machine from snapshot bytes. The current
    /// session keeps running if this fails.
    fn load_snapshot(&mut self, data: &[u8]) -> Result<Box<dyn Emulator>, SnapshotError>;

    /// Battery-backed PRG-RAM, if the board persists it
    fn prg_ram(&self) -> Option<&[u8]>;

    /// Restore PRG-RAM from a save file
    fn set_prg_ram(&mut self, data: &[u8]) -> Result<(), RamSizeMismatch>;

    /// 256x240 RGBA pixels, row-major from the top-left
    fn framebuffer(&self) -> &[u8];

    /// True once per completed frame; reading clears the request
    fn flip_requested(&mut self) -> bool;

    fn update_input(&mut self, input: Input);

    /// Drain up to `dest.len()` bytes of 44.1kHz stereo 16-bit LE PCM;
    /// returns the byte count actually copied
    fn read_sound_buffer(&mut self, dest: &mut [u8]) -> usize;
}

/// The NES machine: CPU + PPU + APU + memory + mapper in lockstep
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Nes {
    #[serde(rename = "CPU")]
    pub(crate) cpu: Cpu,
    #[serde(rename = "PPU")]
    pub(crate) ppu: Ppu,
    #[serde(rename = "APU")]
    pub(crate) apu: Apu,
    pub(crate) mem: Memory,
    #[serde(skip)]
    pub(crate) mapper: Mapper,
    pub(crate) cart_info: CartInfo,
    pub(crate) controllers: Controllers,
    pub(crate) cycles: u64,
    #[serde(skip)]
    pub(crate) config: EmulatorConfig,
}

impl Nes {
    /// Build a machine from a raw iNES image
    pub fn new(rom: &[u8], config: EmulatorConfig) -> Result<Nes, RomError> {
        let cart = CartInfo::parse(rom)?;

        let prg_start = cart.prg_rom_offset();
        let prg_end = prg_start + cart.prg_rom_size();
        let chr_start = cart.chr_rom_offset();
        let chr_end = chr_start + cart.chr_rom_size();
        if rom.len() < prg_end || rom.len() < chr_end {
            return Err(RomError::TooShort);
        }

        let chr = if cart.is_chr_ram() {
            vec![0; cart.chr_ram_size()]
        } else {
            rom[chr_start..chr_end].to_vec()
        };

        let mut mapper = Mapper::from_cart(&cart)?;
        let mut mem = Memory {
            prg_rom: rom[prg_start..prg_end].to_vec(),
            chr,
            prg_ram: vec![0; cart.prg_ram_size()],
            ..Memory::default()
        };
        mapper.init(&mut mem);

        let mut cpu = Cpu::new();
        cpu.reset = true;

        Ok(Nes {
            cpu,
            ppu: Ppu::new(),
            apu: Apu::new(),
            mem,
            mapper,
            cart_info: cart,
            controllers: Controllers::new(),
            cycles: 0,
            config,
        })
    }

    /// Build a bare machine around preassembled buffers; used by the NSF
    /// player, which has no iNES header to parse
    pub(crate) fn from_parts(
        cart: CartInfo,
        mapper: Mapper,
        prg_rom: Vec<u8>,
        config: EmulatorConfig,
    ) -> Nes {
        let mut mem = Memory {
            prg_rom,
            chr: vec![0; 8 * 1024],
            prg_ram: vec![0; 8 * 1024],
            ..Memory::default()
        };
        let mut mapper = mapper;
        mapper.init(&mut mem);

        Nes {
            cpu: Cpu::new(),
            ppu: Ppu::new(),
            apu: Apu::new(),
            mem,
            mapper,
            cart_info: cart,
            controllers: Controllers::new(),
            cycles: 0,
            config,
        }
    }

    /// Advance the whole machine by `n` CPU cycles: three PPU dots, one
    /// APU cycle, and one mapper cycle each
    pub fn run_cycles(&mut self, n: u32) {
        for _ in 0..n {
            self.ppu_step();
            self.ppu_step();
            self.ppu_step();
            self.apu_step();
            self.mapper.cycle(&mut self.cpu, &self.ppu);
            self.cycles += 1;
        }
    }

    /// Total CPU cycles executed since power-on
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn cart_info(&self) -> &CartInfo {
        &self.cart_info
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }
}

impl Emulator for Nes {
    fn step(&mut self) {
        self.handle_interrupts();
        self.cpu.steps += 1;
        self.step_opcode();
    }

    fn make_snapshot(&mut self) -> Vec<u8> {
        self.make_snapshot_bytes()
    }

    fn load_snapshot(&mut self, data: &[u8]) -> Result<Box<dyn Emulator>, SnapshotError> {
        Ok(Box::new(self.load_snapshot_bytes(data)?))
    }

    fn prg_ram(&self) -> Option<&[u8]> {
        if self.cart_info.has_battery_backed_ram() {
            Some(&self.mem.prg_ram)
        } else {
            None
        }
    }

    fn set_prg_ram(&mut self, data: &[u8]) -> Result<(), RamSizeMismatch> {
        if data.len() != self.mem.prg_ram.len() {
            return Err(RamSizeMismatch {
                expected: self.mem.prg_ram.len(),
                got: data.len(),
            });
        }
        self.mem.prg_ram.copy_from_slice(data);
        Ok(())
    }

    fn framebuffer(&self) -> &[u8] {
        self.ppu.framebuffer()
    }

    fn flip_requested(&mut self) -> bool {
        let result = self.ppu.flip_requested;
        self.ppu.flip_requested = false;
        result
    }

    fn update_input(&mut self, input: Input) {
        let mut joypad = input.joypad;
        // The original D-pad cannot press opposing directions at once
        if joypad.up {
            joypad.down = false;
        }
        if joypad.left {
            joypad.right = false;
        }
        self.controllers.current_joypad1 = joypad;
    }

    fn read_sound_buffer(&mut self, dest: &mut [u8]) -> usize {
        self.apu.read_sound_buffer(dest)
    }
}
