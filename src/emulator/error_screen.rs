// Error screen - the emulator a broken ROM boots into
//
// Malformed images and unsupported mappers must not kill the host window,
// so the shell swaps in this no-op machine. It holds a flat error-colored
// framebuffer, reports the failure through the log, and steps as a no-op.

use super::{Emulator, Input, RamSizeMismatch, SnapshotError};
use crate::ppu::FRAME_BYTES;

/// Dark maroon backdrop so a failed load is visually unmistakable
const BACKDROP: [u8; 4] = [0x48, 0x08, 0x10, 0xFF];

/// An emulator that only displays an error condition
pub struct ErrorScreen {
    message: String,
    framebuffer: Vec<u8>,
    flip_requested: bool,
}

impl ErrorScreen {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("{}", message);

        let mut framebuffer = vec![0; FRAME_BYTES];
        for pixel in framebuffer.chunks_exact_mut(4) {
            pixel.copy_from_slice(&BACKDROP);
        }

        ErrorScreen {
            message,
            framebuffer,
            flip_requested: true,
        }
    }

    /// The human-readable failure this screen stands in for
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Emulator for ErrorScreen {
    fn step(&mut self) {}

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
        &self.framebuffer
    }

    fn flip_requested(&mut self) -> bool {
        let result = self.flip_requested;
        self.flip_requested = false;
        result
    }

    fn update_input(&mut self, _input: Input) {}

    fn read_sound_buffer(&mut self, _dest: &mut [u8]) -> usize {
        0
    }
}
