// Display module - window management and the interactive shell loop
//
// Presents the 256x240 framebuffer through winit + pixels and owns the
// per-frame shell duties: polling keys, stepping the emulator to the next
// frame flip, draining sound, and the snapshot/save-file chores.

mod app;

use std::time::Duration;

pub use app::run_shell;

use crate::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Window configuration
#[derive(Debug, Clone, Copy)]
pub struct WindowConfig {
    /// Integer scale factor (1x-8x)
    pub scale: u32,
    /// Skip frame-time throttling (the `--fast` flag)
    pub fast: bool,
}

impl WindowConfig {
    pub fn new() -> Self {
        Self {
            scale: 2,
            fast: false,
        }
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.clamp(1, 8);
        self
    }

    pub fn with_fast(mut self, fast: bool) -> Self {
        self.fast = fast;
        self
    }

    pub fn window_width(&self) -> u32 {
        SCREEN_WIDTH as u32 * self.scale
    }

    pub fn window_height(&self) -> u32 {
        SCREEN_HEIGHT as u32 * self.scale
    }

    /// NTSC frame cadence
    pub fn frame_duration(&self) -> Duration {
        Duration::from_micros(16_742)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new()
    }
}
