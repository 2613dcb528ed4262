//! Pulse wave channel implementation

use serde::{Deserialize, Serialize};

use crate::apu::components::{Envelope, LengthCounter, Sweep, Timer};
use crate::apu::constants::DUTY_PATTERNS;

/// Pulse wave channel (used for both Pulse 1 and Pulse 2)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PulseChannel {
    /// Enabled flag (from $4015)
    pub(crate) enabled: bool,
    /// Duty cycle selector (0-3)
    pub(crate) duty: u8,
    /// Duty cycle sequence position (0-7)
    duty_position: u8,
    pub(crate) envelope: Envelope,
    pub(crate) sweep: Sweep,
    pub(crate) length_counter: LengthCounter,
    pub(crate) timer: Timer,
}

impl PulseChannel {
    /// `ones_complement` selects pulse 1's sweep negate behavior
    pub fn new(ones_complement: bool) -> Self {
        Self {
            enabled: false,
            duty: 0,
            duty_position: 0,
            envelope: Envelope::new(),
            sweep: Sweep::new(ones_complement),
            length_counter: LengthCounter::new(),
            timer: Timer::new(),
        }
    }

    /// $4000/$4004: duty cycle and envelope
    pub fn write_vol_duty_reg(&mut self, data: u8) {
        self.duty = (data >> 6) & 0x03;
        self.length_counter.set_halt(data & 0x20 != 0);
        self.envelope.write_control(data);
    }

    /// $4001/$4005: sweep unit
    pub fn write_sweep_reg(&mut self, data: u8) {
        self.sweep.write_control(data);
    }

    /// $4002/$4006: timer low byte
    pub fn write_period_low_reg(&mut self, data: u8) {
        self.timer.set_period_low(data);
    }

    /// $4003/$4007: timer high bits and length counter load. Also restarts
    /// the envelope and resets the duty sequencer.
    pub fn write_period_high_reg(&mut self, data: u8) {
        self.timer.set_period_high(data);
        self.length_counter.load(data >> 3);
        self.envelope.restart();
        self.duty_position = 0;
    }

    /// Enable/disable from $4015; disabling clears the length counter
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.length_counter.clear();
        }
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.length_counter.is_active()
    }

    /// Clocked every second CPU cycle
    pub fn clock_timer(&mut self) {
        if self.timer.clock() {
            self.duty_position = (self.duty_position + 1) % 8;
        }
    }

    pub fn clock_envelope(&mut self) {
        self.envelope.clock();
    }

    pub fn clock_length_counter(&mut self) {
        self.length_counter.clock();
    }

    pub fn clock_sweep(&mut self) {
        if let Some(new_period) = self.sweep.clock(self.timer.period) {
            self.timer.set_period(new_period);
        }
    }

    /// Current output sample (0 or the envelope volume)
    pub fn output(&self) -> u8 {
        if !self.is_active() {
            return 0;
        }
        if self.sweep.is_muting(self.timer.period) {
            return 0;
        }
        let duty_output = DUTY_PATTERNS[usize::from(self.duty)][usize::from(self.duty_position)];
        if duty_output == 0 {
            0
        } else {
            self.envelope.volume()
        }
    }
}
