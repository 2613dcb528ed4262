// APU module - Audio Processing Unit (2A03) implementation
//
// One APU cycle is one CPU cycle. The frame counter divides the CPU clock
// into quarter and half frames that drive envelopes, length counters, the
// triangle's linear counter, and the sweep units. Channel outputs pass
// through the non-linear mixer and a DC-blocking filter, then get averaged
// down to 44.1kHz stereo PCM in the ring buffer.
//
// ## Register Map
//
// | Address       | Channel  | Registers                           |
// |---------------|----------|-------------------------------------|
// | $4000-$4003   | Pulse 1  | duty/envelope, sweep, period        |
// | $4004-$4007   | Pulse 2  | duty/envelope, sweep, period        |
// | $4008-$400B   | Triangle | linear counter, period              |
// | $400C-$400F   | Noise    | envelope, mode/period, length       |
// | $4010-$4013   | DMC      | flags/rate, level, address, length  |
// | $4015         | Status   | channel enables / length status     |
// | $4017         | Frame    | sequencer mode, IRQ inhibit         |

pub mod channels;
pub mod components;
pub mod constants;
pub mod ring_buffer;

use serde::{Deserialize, Serialize};

use crate::emulator::Nes;
use channels::{DmcChannel, NoiseChannel, PulseChannel, TriangleChannel};
use constants::CYCLES_PER_SAMPLE;
pub use ring_buffer::RingBuffer;

// 4-step frame sequence, in CPU cycles from the last reset
const STEP_QUARTER_1: u32 = 7457;
const STEP_HALF_1: u32 = 14913;
const STEP_QUARTER_3: u32 = 22371;
const STEP_IRQ_A: u32 = 29828;
const STEP_IRQ_B: u32 = 29829;
const STEP_LAST: u32 = 37281;
const SEQUENCE_RESET: u32 = 37282;

/// Audio Processing Unit state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Apu {
    pub(crate) pulse1: PulseChannel,
    pub(crate) pulse2: PulseChannel,
    pub(crate) triangle: TriangleChannel,
    pub(crate) noise: NoiseChannel,
    pub(crate) dmc: DmcChannel,

    /// Frame counter: 0 = 4-step, 1 = 5-step
    sequencer_mode: u8,
    irq_inhibit: bool,
    pub(crate) frame_irq: bool,
    frame_counter: u32,

    /// Pulse timers run at half the CPU clock
    cycle_parity: bool,

    // DC blocker state (y[n] = x[n] - x[n-1] + 0.995 y[n-1])
    last_sample: f32,
    last_corrected_sample: f32,

    // Downsampling accumulator
    sample_sum: f64,
    sample_count: u32,
    sample_clock: f64,

    #[serde(skip)]
    pub(crate) buffer: RingBuffer,
}

impl Apu {
    pub fn new() -> Self {
        Apu {
            pulse1: PulseChannel::new(true),
            pulse2: PulseChannel::new(false),
            triangle: TriangleChannel::new(),
            noise: NoiseChannel::new(),
            dmc: DmcChannel::new(),
            sequencer_mode: 0,
            irq_inhibit: false,
            frame_irq: false,
            frame_counter: 0,
            cycle_parity: false,
            last_sample: 0.0,
            last_corrected_sample: 0.0,
            sample_sum: 0.0,
            sample_count: 0,
            sample_clock: 0.0,
            buffer: RingBuffer::default(),
        }
    }

    /// Quarter frame: envelopes and the triangle's linear counter
    fn clock_quarter_frame(&mut self) {
        self.pulse1.clock_envelope();
        self.pulse2.clock_envelope();
        self.noise.clock_envelope();
        self.triangle.clock_linear_counter();
    }

    /// Half frame: length counters and sweeps
    fn clock_half_frame(&mut self) {
        self.pulse1.clock_length_counter();
        self.pulse1.clock_sweep();
        self.pulse2.clock_length_counter();
        self.pulse2.clock_sweep();
        self.triangle.clock_length_counter();
        self.noise.clock_length_counter();
    }

    /// Advance the frame counter by one CPU cycle
    fn clock_frame_counter(&mut self) {
        self.frame_counter += 1;
        if self.sequencer_mode == 0 {
            match self.frame_counter {
                STEP_QUARTER_1 | STEP_QUARTER_3 => self.clock_quarter_frame(),
                STEP_HALF_1 | STEP_IRQ_A => {
                    self.clock_quarter_frame();
                    self.clock_half_frame();
                }
                _ => {}
            }
            if matches!(self.frame_counter, STEP_IRQ_A | STEP_IRQ_B | STEP_LAST)
                && !self.irq_inhibit
            {
                self.frame_irq = true;
            }
        } else {
            match self.frame_counter {
                STEP_QUARTER_1 | STEP_QUARTER_3 => self.clock_quarter_frame(),
                STEP_HALF_1 | STEP_LAST => {
                    self.clock_quarter_frame();
                    self.clock_half_frame();
                }
                _ => {}
            }
        }
        if self.frame_counter >= SEQUENCE_RESET {
            self.frame_counter = 0;
        }
    }

    /// $4017 write: sequencer mode and IRQ inhibit. Selecting 5-step mode
    /// clocks everything immediately.
    pub(crate) fn write_frame_counter_reg(&mut self, val: u8) {
        self.sequencer_mode = val >> 7;
        self.irq_inhibit = val & 0x40 != 0;
        if self.irq_inhibit {
            self.frame_irq = false;
        }
        self.frame_counter = 0;
        if self.sequencer_mode == 1 {
            self.clock_quarter_frame();
            self.clock_half_frame();
        }
    }

    /// $4015 write: channel enables; clears the DMC IRQ flag
    pub(crate) fn write_status_reg(&mut self, val: u8) {
        self.pulse1.set_enabled(val & 0x01 != 0);
        self.pulse2.set_enabled(val & 0x02 != 0);
        self.triangle.set_enabled(val & 0x04 != 0);
        self.noise.set_enabled(val & 0x08 != 0);
        self.dmc.set_enabled(val & 0x10 != 0);
        self.dmc.clear_irq();
    }

    /// $4015 read: length/IRQ status; clears the frame IRQ flag
    pub(crate) fn read_status_reg(&mut self) -> u8 {
        let mut result = 0x20u8; // open bus bit
        if self.pulse1.length_counter.is_active() {
            result |= 0x01;
        }
        if self.pulse2.length_counter.is_active() {
            result |= 0x02;
        }
        if self.triangle.length_counter.is_active() {
            result |= 0x04;
        }
        if self.noise.length_counter.is_active() {
            result |= 0x08;
        }
        if self.dmc.is_active() {
            result |= 0x10;
        }
        if self.frame_irq {
            result |= 0x40;
        }
        if self.dmc.irq_flag {
            result |= 0x80;
        }
        self.frame_irq = false;
        result
    }

    /// Mix the channel outputs with the standard non-linear approximation
    fn mix(&self) -> f32 {
        let p1 = f32::from(self.pulse1.output());
        let p2 = f32::from(self.pulse2.output());
        let tri = f32::from(self.triangle.output());
        let noise = f32::from(self.noise.output());
        let dmc = f32::from(self.dmc.output());

        let pulse_out = if p1 + p2 == 0.0 {
            0.0
        } else {
            95.88 / (8128.0 / (p1 + p2) + 100.0)
        };

        let tnd_sum = tri / 8227.0 + noise / 12241.0 + dmc / 22638.0;
        let tnd_out = if tnd_sum == 0.0 {
            0.0
        } else {
            159.79 / (1.0 / tnd_sum + 100.0)
        };

        pulse_out + tnd_out
    }

    /// One-pole DC blocker over the mixed sample
    fn dc_block(&mut self, sample: f32) -> f32 {
        let corrected = sample - self.last_sample + 0.995 * self.last_corrected_sample;
        self.last_sample = sample;
        self.last_corrected_sample = corrected;
        corrected
    }

    /// Accumulate one CPU cycle's output; emits a stereo frame roughly
    /// every 40.58 cycles
    fn accumulate_sample(&mut self) {
        let corrected = {
            let mixed = self.mix();
            self.dc_block(mixed)
        };
        self.sample_sum += f64::from(corrected);
        self.sample_count += 1;
        self.sample_clock += 1.0;

        if self.sample_clock >= CYCLES_PER_SAMPLE {
            self.sample_clock -= CYCLES_PER_SAMPLE;
            let average = (self.sample_sum / f64::from(self.sample_count)) as f32;
            self.sample_sum = 0.0;
            self.sample_count = 0;

            let pcm = (average * 32767.0).clamp(-32768.0, 32767.0) as i16;
            let bytes = pcm.to_le_bytes();
            // Mono source on both stereo channels
            self.buffer.write(&[bytes[0], bytes[1], bytes[0], bytes[1]]);
        }
    }

    /// Drain up to `dest.len()` bytes of PCM; returns bytes copied
    pub fn read_sound_buffer(&mut self, dest: &mut [u8]) -> usize {
        self.buffer.read(dest)
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Nes {
    /// Advance the APU by one CPU cycle
    pub(crate) fn apu_step(&mut self) {
        self.apu.clock_frame_counter();

        self.apu.cycle_parity = !self.apu.cycle_parity;
        if self.apu.cycle_parity {
            self.apu.pulse1.clock_timer();
            self.apu.pulse2.clock_timer();
        }
        self.apu.triangle.clock_timer();
        self.apu.noise.clock_timer();

        // The DMC fetches sample bytes over the CPU bus
        if let Some(addr) = self.apu.dmc.clock_timer() {
            let byte = self.read(addr);
            self.apu.dmc.load_sample_byte(byte);
        }

        self.apu.accumulate_sample();

        // Frame counter and DMC IRQs hold the line until acknowledged
        if self.apu.frame_irq || self.apu.dmc.irq_flag {
            self.cpu.irq = true;
        }
    }

    pub(crate) fn apu_read_status(&mut self) -> u8 {
        self.apu.read_status_reg()
    }

    pub(crate) fn apu_write_status(&mut self, val: u8) {
        self.apu.write_status_reg(val);
    }

    pub(crate) fn apu_write_frame_counter(&mut self, val: u8) {
        self.apu.write_frame_counter_reg(val);
    }

    /// Writes to $4000-$4013
    pub(crate) fn apu_register_write(&mut self, addr: u16, val: u8) {
        match addr {
            0x4000 => self.apu.pulse1.write_vol_duty_reg(val),
            0x4001 => self.apu.pulse1.write_sweep_reg(val),
            0x4002 => self.apu.pulse1.write_period_low_reg(val),
            0x4003 => self.apu.pulse1.write_period_high_reg(val),

            0x4004 => self.apu.pulse2.write_vol_duty_reg(val),
            0x4005 => self.apu.pulse2.write_sweep_reg(val),
            0x4006 => self.apu.pulse2.write_period_low_reg(val),
            0x4007 => self.apu.pulse2.write_period_high_reg(val),

            0x4008 => self.apu.triangle.write_linear_counter_reg(val),
            0x4009 => {} // unused
            0x400A => self.apu.triangle.write_period_low_reg(val),
            0x400B => self.apu.triangle.write_period_high_reg(val),

            0x400C => self.apu.noise.write_vol_reg(val),
            0x400D => {} // unused
            0x400E => self.apu.noise.write_control_reg(val),
            0x400F => self.apu.noise.write_length_reg(val),

            0x4010 => self.apu.dmc.write_flags_and_rate_reg(val),
            0x4011 => self.apu.dmc.write_direct_load_reg(val),
            0x4012 => self.apu.dmc.write_sample_address_reg(val),
            0x4013 => self.apu.dmc.write_sample_length_reg(val),

            _ => unreachable!("apu register range is 0x4000-0x4013"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reflects_length_counters() {
        let mut apu = Apu::new();
        apu.write_status_reg(0x01);
        apu.pulse1.write_vol_duty_reg(0x30);
        apu.pulse1.write_period_high_reg(0x08);
        assert_eq!(apu.read_status_reg() & 0x0F, 0x01);

        apu.write_status_reg(0x03);
        apu.pulse2.write_period_high_reg(0x08);
        assert_eq!(apu.read_status_reg() & 0x0F, 0x03);
    }

    #[test]
    fn test_disable_clears_length() {
        let mut apu = Apu::new();
        apu.write_status_reg(0x0F);
        apu.pulse1.write_period_high_reg(0x08);
        apu.write_status_reg(0x00);
        assert_eq!(apu.read_status_reg() & 0x0F, 0x00);
    }

    #[test]
    fn test_frame_irq_raised_in_4_step_mode() {
        let mut apu = Apu::new();
        for _ in 0..STEP_IRQ_A {
            apu.clock_frame_counter();
        }
        assert!(apu.frame_irq);
    }

    #[test]
    fn test_frame_irq_never_set_while_inhibited() {
        let mut apu = Apu::new();
        apu.write_frame_counter_reg(0x40);
        for _ in 0..(SEQUENCE_RESET * 2) {
            apu.clock_frame_counter();
            assert!(!apu.frame_irq);
        }
    }

    #[test]
    fn test_5_step_mode_has_no_irq() {
        let mut apu = Apu::new();
        apu.write_frame_counter_reg(0x80);
        for _ in 0..(SEQUENCE_RESET * 2) {
            apu.clock_frame_counter();
        }
        assert!(!apu.frame_irq);
    }

    #[test]
    fn test_5_step_write_clocks_immediately() {
        let mut apu = Apu::new();
        apu.write_status_reg(0x01);
        apu.pulse1.write_vol_duty_reg(0x00); // no halt
        apu.pulse1.write_period_high_reg(0x08); // length table entry 1 = 254
        apu.write_frame_counter_reg(0x80);
        assert_eq!(apu.pulse1.length_counter.counter, 253);
    }

    #[test]
    fn test_status_read_clears_frame_irq() {
        let mut apu = Apu::new();
        apu.frame_irq = true;
        assert_eq!(apu.read_status_reg() & 0x40, 0x40);
        assert_eq!(apu.read_status_reg() & 0x40, 0x00);
    }

    #[test]
    fn test_mixer_idle_level_is_triangle_dc() {
        // The triangle sequencer holds 15 at power-on, so an otherwise
        // silent mix sits at the tnd level for a lone triangle at 15
        let apu = Apu::new();
        let expected = 159.79 / (1.0 / (15.0 / 8227.0) + 100.0);
        assert!((apu.mix() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_mixer_formula_spot_value() {
        let mut apu = Apu::new();
        let idle = apu.mix();

        apu.write_status_reg(0x01);
        apu.pulse1.write_vol_duty_reg(0x3F); // constant volume 15
        apu.pulse1.write_period_low_reg(0xFD);
        apu.pulse1.write_period_high_reg(0x00);
        // Walk the duty sequencer onto a set bit
        apu.pulse1.clock_timer();

        // Pulse and tnd groups mix independently, so the pulse term is the
        // exact difference against the idle level
        let expected = 95.88 / (8128.0 / 15.0 + 100.0);
        assert!((apu.mix() - idle - expected).abs() < 1e-6);
    }

    #[test]
    fn test_downsampler_produces_44100_rate() {
        let mut apu = Apu::new();
        // One second of CPU cycles should produce one second of samples
        let mut sink = [0u8; 4096];
        let mut total_bytes = 0usize;
        for _ in 0..1_789_773u32 {
            apu.accumulate_sample();
            total_bytes += apu.buffer.read(&mut sink);
        }
        total_bytes += apu.buffer.read(&mut sink);
        let frames = (total_bytes / 4) as i64;
        assert!((frames - 44_100).unsigned_abs() < 20, "got {} frames", frames);
    }
}
