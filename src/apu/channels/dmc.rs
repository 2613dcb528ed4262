//! DMC (delta modulation) channel implementation
//
// Plays 1-bit delta-coded samples fetched over the cartridge bus. The
// channel itself never touches the bus: `clock_timer` hands back the
// address it wants and the caller feeds the byte in with `load_sample_byte`.

use serde::{Deserialize, Serialize};

use crate::apu::constants::DMC_RATE_TABLE;

/// DMC channel state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DmcChannel {
    pub(crate) enabled: bool,
    /// 4-bit index into the rate table
    rate_index: u8,
    pub(crate) irq_enabled: bool,
    loop_enabled: bool,
    /// Programmed sample start ($C000 + 64 * value)
    sample_address: u16,
    /// Programmed sample length (16 * value + 1)
    pub(crate) sample_length: u16,

    /// 7-bit output level
    pub(crate) output_level: u8,
    /// Byte currently being shifted out, LSB first
    shift_register: u8,
    bits_remaining: u8,
    /// Address of the next byte to fetch
    current_address: u16,
    pub(crate) bytes_remaining: u16,
    silence: bool,
    timer_counter: u16,

    pub(crate) irq_flag: bool,
}

impl DmcChannel {
    pub fn new() -> Self {
        Self {
            enabled: false,
            rate_index: 0,
            irq_enabled: false,
            loop_enabled: false,
            sample_address: 0xC000,
            sample_length: 1,
            output_level: 0,
            shift_register: 0,
            bits_remaining: 8,
            current_address: 0xC000,
            bytes_remaining: 0,
            silence: true,
            timer_counter: 0,
            irq_flag: false,
        }
    }

    /// $4010: IRQ enable, loop, rate
    pub fn write_flags_and_rate_reg(&mut self, data: u8) {
        self.irq_enabled = data & 0x80 != 0;
        self.loop_enabled = data & 0x40 != 0;
        self.rate_index = data & 0x0F;
        if !self.irq_enabled {
            self.irq_flag = false;
        }
    }

    /// $4011: direct 7-bit load of the output level
    pub fn write_direct_load_reg(&mut self, data: u8) {
        self.output_level = data & 0x7F;
    }

    /// $4012: sample start address
    pub fn write_sample_address_reg(&mut self, data: u8) {
        self.sample_address = 0xC000 | (u16::from(data) << 6);
    }

    /// $4013: sample length
    pub fn write_sample_length_reg(&mut self, data: u8) {
        self.sample_length = (u16::from(data) << 4) + 1;
    }

    /// Enable/disable from $4015. Enabling with an exhausted sample
    /// restarts it; disabling stops after the current byte.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            if self.bytes_remaining == 0 {
                self.restart_sample();
            }
        } else {
            self.bytes_remaining = 0;
        }
    }

    fn restart_sample(&mut self) {
        self.current_address = self.sample_address;
        self.bytes_remaining = self.sample_length;
    }

    pub fn is_active(&self) -> bool {
        self.bytes_remaining > 0
    }

    /// Clocked every CPU cycle. Returns the address of a sample byte the
    /// caller must fetch and feed back through `load_sample_byte`.
    pub fn clock_timer(&mut self) -> Option<u16> {
        if self.timer_counter > 0 {
            self.timer_counter -= 1;
            return None;
        }
        self.timer_counter = DMC_RATE_TABLE[usize::from(self.rate_index)];

        // Consume one bit, moving the output level by +-2
        if !self.silence {
            if self.shift_register & 0x01 != 0 {
                if self.output_level <= 125 {
                    self.output_level += 2;
                }
            } else if self.output_level >= 2 {
                self.output_level -= 2;
            }
        }
        self.shift_register >>= 1;
        self.bits_remaining -= 1;

        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            if self.bytes_remaining > 0 {
                let addr = self.current_address;
                // The address wraps from $FFFF back into the sample region
                self.current_address = if self.current_address == 0xFFFF {
                    0x8000
                } else {
                    self.current_address + 1
                };
                self.bytes_remaining -= 1;
                if self.bytes_remaining == 0 {
                    if self.loop_enabled {
                        self.restart_sample();
                    } else if self.irq_enabled {
                        self.irq_flag = true;
                    }
                }
                return Some(addr);
            }
            self.silence = true;
        }
        None
    }

    /// Feed in the byte fetched for the address from `clock_timer`
    pub fn load_sample_byte(&mut self, data: u8) {
        self.shift_register = data;
        self.silence = false;
    }

    pub fn clear_irq(&mut self) {
        self.irq_flag = false;
    }

    pub fn output(&self) -> u8 {
        self.output_level
    }
}

impl Default for DmcChannel {
    fn default() -> Self {
        Self::new()
    }
}
