//! Triangle wave channel implementation

use serde::{Deserialize, Serialize};

use crate::apu::components::{LengthCounter, LinearCounter, Timer};
use crate::apu::constants::TRIANGLE_SEQUENCE;

/// Triangle channel: a 32-step 15-to-0-to-15 staircase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TriangleChannel {
    pub(crate) enabled: bool,
    /// Sequencer position (0-31)
    sequence_position: u8,
    pub(crate) linear_counter: LinearCounter,
    pub(crate) length_counter: LengthCounter,
    pub(crate) timer: Timer,
}

impl TriangleChannel {
    pub fn new() -> Self {
        Self {
            enabled: false,
            sequence_position: 0,
            linear_counter: LinearCounter::new(),
            length_counter: LengthCounter::new(),
            timer: Timer::new(),
        }
    }

    /// $4008: linear counter control
    pub fn write_linear_counter_reg(&mut self, data: u8) {
        self.linear_counter.write_control(data);
        // The control bit doubles as the length counter halt
        self.length_counter.set_halt(data & 0x80 != 0);
    }

    /// $400A: timer low byte
    pub fn write_period_low_reg(&mut self, data: u8) {
        self.timer.set_period_low(data);
    }

    /// $400B: timer high bits, length load, linear reload flag
    pub fn write_period_high_reg(&mut self, data: u8) {
        self.timer.set_period_high(data);
        self.length_counter.load(data >> 3);
        self.linear_counter.set_reload_flag();
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

    /// Clocked every CPU cycle. The sequencer only advances while both
    /// duration gates are open, and periods below 2 freeze it to keep
    /// ultrasonic pops out of the mix.
    pub fn clock_timer(&mut self) {
        if self.timer.clock()
            && self.is_active()
            && self.linear_counter.is_active()
            && self.timer.period >= 2
        {
            self.sequence_position = (self.sequence_position + 1) % 32;
        }
    }

    pub fn clock_linear_counter(&mut self) {
        self.linear_counter.clock();
    }

    pub fn clock_length_counter(&mut self) {
        self.length_counter.clock();
    }

    /// The triangle holds its last level while gated rather than dropping
    /// to zero
    pub fn output(&self) -> u8 {
        TRIANGLE_SEQUENCE[usize::from(self.sequence_position)]
    }
}

impl Default for TriangleChannel {
    fn default() -> Self {
        Self::new()
    }
}
