//! Length counter for controlling note duration

use serde::{Deserialize, Serialize};

use crate::apu::constants::LENGTH_COUNTER_TABLE;

/// Down-counter that silences its channel at zero unless halted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LengthCounter {
    pub(crate) counter: u8,
    halt: bool,
}

impl LengthCounter {
    pub fn new() -> Self {
        Self {
            counter: 0,
            halt: false,
        }
    }

    /// Clock the counter (called by the frame counter's half frame)
    pub fn clock(&mut self) {
        if !self.halt && self.counter > 0 {
            self.counter -= 1;
        }
    }

    /// Load a new value through the 5-bit length table
    pub fn load(&mut self, index: u8) {
        self.counter = LENGTH_COUNTER_TABLE[usize::from(index & 0x1F)];
    }

    pub fn is_active(&self) -> bool {
        self.counter > 0
    }

    pub fn clear(&mut self) {
        self.counter = 0;
    }

    pub fn set_halt(&mut self, halt: bool) {
        self.halt = halt;
    }
}

impl Default for LengthCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_decrements() {
        let mut lc = LengthCounter::new();
        lc.load(1);
        assert_eq!(lc.counter, 254);
        lc.clock();
        assert_eq!(lc.counter, 253);
    }

    #[test]
    fn test_halt_freezes_counter() {
        let mut lc = LengthCounter::new();
        lc.load(0);
        lc.set_halt(true);
        lc.clock();
        assert_eq!(lc.counter, 10);
    }

    #[test]
    fn test_stops_at_zero() {
        let mut lc = LengthCounter::new();
        lc.load(3); // 2
        lc.clock();
        lc.clock();
        lc.clock();
        assert_eq!(lc.counter, 0);
        assert!(!lc.is_active());
    }
}
