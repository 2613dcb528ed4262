//! Linear counter for the triangle channel

use serde::{Deserialize, Serialize};

/// Second, finer-grained duration gate used only by the triangle channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinearCounter {
    pub(crate) counter: u8,
    reload_value: u8,
    reload_flag: bool,
    /// Control (halt) flag; while set, the reload flag is never cleared
    control: bool,
}

impl LinearCounter {
    pub fn new() -> Self {
        Self {
            counter: 0,
            reload_value: 0,
            reload_flag: false,
            control: false,
        }
    }

    /// Clock the counter (called by the frame counter's quarter frame)
    pub fn clock(&mut self) {
        if self.reload_flag {
            self.counter = self.reload_value;
        } else if self.counter > 0 {
            self.counter -= 1;
        }
        if !self.control {
            self.reload_flag = false;
        }
    }

    pub fn write_control(&mut self, data: u8) {
        self.control = data & 0x80 != 0;
        self.reload_value = data & 0x7F;
    }

    /// Set by writes to the triangle's period-high register
    pub fn set_reload_flag(&mut self) {
        self.reload_flag = true;
    }

    pub fn is_active(&self) -> bool {
        self.counter > 0
    }
}

impl Default for LinearCounter {
    fn default() -> Self {
        Self::new()
    }
}
