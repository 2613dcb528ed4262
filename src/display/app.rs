// The interactive shell: event loop, key mapping, frame pacing
//
// Controls:
//   k / j          A / B
//   t / y          Select / Start
//   w / a / s / d  D-pad
//   m then 0-9     mark a snapshot in that slot
//   l then 0-9     load the snapshot in that slot
//
// The battery save (<rom>.sav) is rewritten every five seconds while the
// cartridge reports battery-backed PRG-RAM.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::{Pixels, SurfaceTexture};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use super::WindowConfig;
use crate::emulator::{Emulator, Input};
use crate::input::Joypad;
use crate::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// How often the battery save file is flushed
const SAVE_INTERVAL: Duration = Duration::from_secs(5);

/// Ceiling on instructions per frame, in case a ROM wedges the PPU into
/// never requesting a flip
const MAX_STEPS_PER_FRAME: u32 = 200_000;

/// Pending snapshot action, armed by the m/l keys
#[derive(Clone, Copy, PartialEq, Eq)]
enum SnapshotMode {
    Idle,
    Mark,
    Load,
}

/// Currently held keys, polled once per frame like a real controller
#[derive(Default)]
struct KeyStates {
    a: bool,
    b: bool,
    select: bool,
    start: bool,
    up: bool,
    down: bool,
    left: bool,
    right: bool,
}

struct EmulatorApp {
    emulator: Box<dyn Emulator>,
    rom_path: PathBuf,
    config: WindowConfig,

    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,

    keys: KeyStates,
    snapshot_mode: SnapshotMode,
    pending_digit: Option<u8>,

    last_flip_time: Instant,
    last_save_time: Instant,

    #[cfg(feature = "audio")]
    audio: Option<crate::audio::AudioOutput>,
    sound_scratch: Vec<u8>,
}

impl EmulatorApp {
    fn joypad(&self) -> Joypad {
        Joypad {
            a: self.keys.a,
            b: self.keys.b,
            select: self.keys.select,
            start: self.keys.start,
            up: self.keys.up,
            down: self.keys.down,
            left: self.keys.left,
            right: self.keys.right,
        }
    }

    fn handle_key(&mut self, code: KeyCode, pressed: bool) {
        match code {
            KeyCode::KeyK => self.keys.a = pressed,
            KeyCode::KeyJ => self.keys.b = pressed,
            KeyCode::KeyT => self.keys.select = pressed,
            KeyCode::KeyY => self.keys.start = pressed,
            KeyCode::KeyW => self.keys.up = pressed,
            KeyCode::KeyS => self.keys.down = pressed,
            KeyCode::KeyA => self.keys.left = pressed,
            KeyCode::KeyD => self.keys.right = pressed,
            KeyCode::KeyM if pressed => self.snapshot_mode = SnapshotMode::Mark,
            KeyCode::KeyL if pressed => self.snapshot_mode = SnapshotMode::Load,
            _ if pressed => {
                if let Some(digit) = digit_of(code) {
                    self.pending_digit = Some(digit);
                }
            }
            _ => {}
        }
    }

    fn snapshot_path(&self, slot: u8) -> PathBuf {
        let mut name = self.rom_path.as_os_str().to_os_string();
        name.push(format!(".snapshot{}", slot));
        PathBuf::from(name)
    }

    fn save_path(&self) -> PathBuf {
        let mut name = self.rom_path.as_os_str().to_os_string();
        name.push(".sav");
        PathBuf::from(name)
    }

    /// Act on an armed m/l + digit pair
    fn handle_snapshot_keys(&mut self) {
        let Some(digit) = self.pending_digit.take() else {
            return;
        };
        if digit == 0 || self.snapshot_mode == SnapshotMode::Idle {
            return;
        }
        let path = self.snapshot_path(digit);
        match self.snapshot_mode {
            SnapshotMode::Mark => {
                let snapshot = self.emulator.make_snapshot();
                if snapshot.is_empty() {
                    log::warn!("snapshots not supported for this image");
                } else if let Err(e) = std::fs::write(&path, snapshot) {
                    log::error!("failed to write snapshot: {}", e);
                } else {
                    log::info!(
                        "marked snapshot {} at {}",
                        digit,
                        chrono::Local::now().format("%H:%M:%S")
                    );
                }
            }
            SnapshotMode::Load => match std::fs::read(&path) {
                Ok(bytes) => match self.emulator.load_snapshot(&bytes) {
                    Ok(replacement) => {
                        self.emulator = replacement;
                        log::info!("loaded snapshot {}", digit);
                    }
                    Err(e) => log::error!("failed to load snapshot: {}", e),
                },
                Err(e) => log::error!("failed to load snapshot: {}", e),
            },
            SnapshotMode::Idle => {}
        }
        self.snapshot_mode = SnapshotMode::Idle;
    }

    /// Rewrite the battery save when due
    fn handle_battery_save(&mut self) {
        if self.last_save_time.elapsed() < SAVE_INTERVAL {
            return;
        }
        if let Some(ram) = self.emulator.prg_ram() {
            if let Err(e) = std::fs::write(self.save_path(), ram) {
                log::error!("failed to write save file: {}", e);
            }
            self.last_save_time = Instant::now();
        }
    }

    /// Run the machine up to the next frame flip
    fn run_frame(&mut self) {
        self.handle_snapshot_keys();

        self.emulator.update_input(Input {
            joypad: self.joypad(),
        });

        let mut steps = 0;
        while !self.emulator.flip_requested() {
            self.emulator.step();
            steps += 1;
            if steps >= MAX_STEPS_PER_FRAME {
                break;
            }
        }

        #[cfg(feature = "audio")]
        if let Some(audio) = &self.audio {
            let filled = {
                let scratch = &mut self.sound_scratch;
                self.emulator.read_sound_buffer(scratch)
            };
            audio.push_samples(&self.sound_scratch[..filled]);
        }
        #[cfg(not(feature = "audio"))]
        {
            // Keep the core's ring buffer from sitting full
            let _ = self.emulator.read_sound_buffer(&mut self.sound_scratch);
        }

        self.handle_battery_save();
    }

    fn present(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(pixels) = &mut self.pixels {
            pixels
                .frame_mut()
                .copy_from_slice(self.emulator.framebuffer());
            if let Err(e) = pixels.render() {
                log::error!("render error: {}", e);
                event_loop.exit();
            }
        }
    }

    fn throttle(&mut self) {
        if !self.config.fast {
            let spent = self.last_flip_time.elapsed();
            if let Some(remaining) = self.config.frame_duration().checked_sub(spent) {
                std::thread::sleep(remaining);
            }
        }
        self.last_flip_time = Instant::now();
    }
}

fn digit_of(code: KeyCode) -> Option<u8> {
    match code {
        KeyCode::Digit0 => Some(0),
        KeyCode::Digit1 => Some(1),
        KeyCode::Digit2 => Some(2),
        KeyCode::Digit3 => Some(3),
        KeyCode::Digit4 => Some(4),
        KeyCode::Digit5 => Some(5),
        KeyCode::Digit6 => Some(6),
        KeyCode::Digit7 => Some(7),
        KeyCode::Digit8 => Some(8),
        KeyCode::Digit9 => Some(9),
        _ => None,
    }
}

impl ApplicationHandler for EmulatorApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("famicore")
            .with_inner_size(LogicalSize::new(
                self.config.window_width(),
                self.config.window_height(),
            ))
            .with_resizable(false);

        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .expect("failed to create window"),
        );
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        let pixels = Pixels::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, surface)
            .expect("failed to create pixel buffer");

        self.window = Some(window);
        self.pixels = Some(pixels);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                // Final battery flush on the way out
                if let Some(ram) = self.emulator.prg_ram() {
                    let _ = std::fs::write(self.save_path(), ram);
                }
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                self.handle_key(code, state == ElementState::Pressed);
            }
            WindowEvent::RedrawRequested => {
                self.run_frame();
                self.present(event_loop);
                self.throttle();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Run the interactive shell until the window closes
pub fn run_shell(
    emulator: Box<dyn Emulator>,
    rom_path: PathBuf,
    config: WindowConfig,
    audio_enabled: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = EmulatorApp {
        emulator,
        rom_path,
        config,
        window: None,
        pixels: None,
        keys: KeyStates::default(),
        snapshot_mode: SnapshotMode::Idle,
        pending_digit: None,
        last_flip_time: Instant::now(),
        last_save_time: Instant::now(),
        #[cfg(feature = "audio")]
        audio: if audio_enabled {
            match crate::audio::AudioOutput::new() {
                Ok(audio) => Some(audio),
                Err(e) => {
                    log::warn!("audio disabled: {}", e);
                    None
                }
            }
        } else {
            None
        },
        sound_scratch: vec![0; 16 * 1024],
    };
    #[cfg(not(feature = "audio"))]
    let _ = audio_enabled;

    // Restore a battery save when the board persists one
    let save_path = app.save_path();
    if app.emulator.prg_ram().is_some() {
        if let Ok(bytes) = std::fs::read(&save_path) {
            match app.emulator.set_prg_ram(&bytes) {
                Ok(()) => log::info!("loaded save!"),
                Err(e) => log::warn!("error loading savefile: {}", e),
            }
        }
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run_app(&mut app)?;
    Ok(())
}
