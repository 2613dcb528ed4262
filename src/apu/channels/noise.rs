//! Noise channel implementation

use serde::{Deserialize, Serialize};

use crate::apu::components::{Envelope, LengthCounter};
use crate::apu::constants::NOISE_PERIOD_TABLE;

/// Noise channel: a 15-bit LFSR gated by envelope and length counter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NoiseChannel {
    pub(crate) enabled: bool,
    /// 4-bit index into the period table
    period_index: u8,
    /// Short-loop mode taps bit 6 instead of bit 1
    short_loop: bool,
    /// 15-bit linear feedback shift register, seeded with 1
    pub(crate) lfsr: u16,
    timer_counter: u16,
    pub(crate) envelope: Envelope,
    pub(crate) length_counter: LengthCounter,
}

impl NoiseChannel {
    pub fn new() -> Self {
        Self {
            enabled: false,
            period_index: 0,
            short_loop: false,
            lfsr: 1,
            timer_counter: 0,
            envelope: Envelope::new(),
            length_counter: LengthCounter::new(),
        }
    }

    /// $400C: envelope and halt (duty bits ignored)
    pub fn write_vol_reg(&mut self, data: u8) {
        self.length_counter.set_halt(data & 0x20 != 0);
        self.envelope.write_control(data);
    }

    /// $400E: loop mode and period index
    pub fn write_control_reg(&mut self, data: u8) {
        self.short_loop = data & 0x80 != 0;
        self.period_index = data & 0x0F;
    }

    /// $400F: length counter load, envelope restart
    pub fn write_length_reg(&mut self, data: u8) {
        self.length_counter.load(data >> 3);
        self.envelope.restart();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.length_counter.clear();
        }
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.length_counter.is_active()
    }

    /// Clocked every CPU cycle; shifts the LFSR at the table rate
    pub fn clock_timer(&mut self) {
        if self.timer_counter == 0 {
            self.timer_counter = NOISE_PERIOD_TABLE[usize::from(self.period_index)];
            self.shift_lfsr();
        } else {
            self.timer_counter -= 1;
        }
    }

    fn shift_lfsr(&mut self) {
        let tap = if self.short_loop { 6 } else { 1 };
        let feedback = (self.lfsr ^ (self.lfsr >> tap)) & 0x01;
        self.lfsr = (self.lfsr >> 1) | (feedback << 14);
    }

    pub fn clock_envelope(&mut self) {
        self.envelope.clock();
    }

    pub fn clock_length_counter(&mut self) {
        self.length_counter.clock();
    }

    pub fn output(&self) -> u8 {
        if !self.is_active() {
            return 0;
        }
        if self.lfsr & 0x01 != 0 {
            self.envelope.volume()
        } else {
            0
        }
    }
}

impl Default for NoiseChannel {
    fn default() -> Self {
        Self::new()
    }
}
