// APU integration tests driven through the CPU bus

mod common;

use common::machine_with_program;

/// Drain everything currently in the sound ring into `sink`
fn drain_sound(nes: &mut famicore::Nes, sink: &mut Vec<i16>) {
    use famicore::Emulator;
    let mut chunk = [0u8; 4096];
    loop {
        let filled = nes.read_sound_buffer(&mut chunk);
        if filled == 0 {
            break;
        }
        for frame in chunk[..filled].chunks_exact(4) {
            // Left channel of the interleaved stereo stream
            sink.push(i16::from_le_bytes([frame[0], frame[1]]));
        }
    }
}

#[test]
fn pulse_one_produces_a_440hz_square_wave() {
    let mut nes = machine_with_program(&[0xEA]);

    // Enable pulse 1, then program duty 2, constant volume 15, length
    // halted, period $0FD: 1789773 / (16 x 254) = 440.4 Hz
    nes.write(0x4015, 0x01);
    nes.write(0x4000, 0xBF);
    nes.write(0x4002, 0xFD);
    nes.write(0x4003, 0x00);

    // Run one emulated second, draining as we go
    let mut samples = Vec::new();
    for _ in 0..180 {
        nes.run_cycles(10_000);
        drain_sound(&mut nes, &mut samples);
    }
    assert!(samples.len() > 44_000, "got {} samples", samples.len());

    // Count rising zero crossings over exactly one second of samples
    let one_second = &samples[..44_100.min(samples.len())];
    let mut crossings = 0u32;
    for pair in one_second.windows(2) {
        if pair[0] <= 0 && pair[1] > 0 {
            crossings += 1;
        }
    }

    let expected = 1_789_773.0 / (16.0 * 254.0);
    let measured = crossings as f64 * 44_100.0 / one_second.len() as f64;
    assert!(
        (measured - expected).abs() / expected < 0.01,
        "measured {:.1} Hz against {:.1} Hz",
        measured,
        expected
    );
}

#[test]
fn frame_irq_never_fires_with_inhibit_set() {
    let mut nes = machine_with_program(&[0xEA]);
    nes.write(0x4017, 0x40); // inhibit

    // Two full sequences; $4015 bit 6 must stay clear throughout
    for _ in 0..8 {
        nes.run_cycles(10_000);
        assert_eq!(nes.read(0x4015) & 0x40, 0);
    }
}

#[test]
fn frame_irq_reported_and_cleared_via_status() {
    let mut nes = machine_with_program(&[0xEA]);
    nes.write(0x4017, 0x00);
    nes.run_cycles(29_830);

    assert_eq!(nes.read(0x4015) & 0x40, 0x40);
    // The read acknowledged the flag
    assert_eq!(nes.read(0x4015) & 0x40, 0x00);
}

#[test]
fn status_reports_length_counters() {
    let mut nes = machine_with_program(&[0xEA]);
    nes.write(0x4015, 0x0F);
    nes.write(0x4003, 0x08); // pulse 1 length
    nes.write(0x400B, 0x08); // triangle length
    assert_eq!(nes.read(0x4015) & 0x0F, 0x05);

    // Disabling clears the counters immediately
    nes.write(0x4015, 0x00);
    assert_eq!(nes.read(0x4015) & 0x0F, 0x00);
}

#[test]
fn dmc_fetches_sample_bytes_over_the_bus() {
    let mut nes = machine_with_program(&[0xEA]);

    // Sample at $C000 (which the 16KB NROM bank mirrors), one byte long,
    // looping so fetches keep coming
    nes.write(0x4010, 0x4F); // loop, fastest rate
    nes.write(0x4012, 0x00); // sample address $C000
    nes.write(0x4013, 0x00); // length 1
    nes.write(0x4011, 0x40); // center the output level
    nes.write(0x4015, 0x10); // enable DMC

    nes.run_cycles(20_000);
    // The looping fetch keeps the channel active
    assert_eq!(nes.read(0x4015) & 0x10, 0x10);
}
