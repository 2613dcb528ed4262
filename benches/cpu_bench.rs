// CPU benchmarks
// Measures instruction dispatch over a tight spin program

use criterion::{criterion_group, criterion_main, Criterion};
use famicore::{Emulator, EmulatorConfig, Nes};
use std::hint::black_box;

fn test_machine(program: &[u8]) -> Nes {
    let mut rom = vec![0u8; 16 + 16 * 1024 + 8 * 1024];
    rom[0..4].copy_from_slice(b"NES\x1A");
    rom[4] = 1;
    rom[5] = 1;
    rom[16..16 + program.len()].copy_from_slice(program);
    rom[16 + 0x3FFC..16 + 0x3FFE].copy_from_slice(&0x8000u16.to_le_bytes());
    rom[16 + 0x3FFE..16 + 0x4000].copy_from_slice(&0x8000u16.to_le_bytes());

    let config = EmulatorConfig {
        strict_illegal: false,
        strict_io: false,
        ..EmulatorConfig::default()
    };
    let mut nes = Nes::new(&rom, config).unwrap();
    nes.step(); // dispatch RESET
    nes
}

fn bench_cpu_instructions(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_instructions");

    group.bench_function("spin_loop", |b| {
        // JMP $8000: the tightest possible instruction stream
        let mut nes = test_machine(&[0x4C, 0x00, 0x80]);
        b.iter(|| {
            black_box(&mut nes).step();
        });
    });

    group.bench_function("alu_loop", |b| {
        // INX ; ADC #$01 ; STA $00 ; JMP $8000
        let mut nes = test_machine(&[0xE8, 0x69, 0x01, 0x85, 0x00, 0x4C, 0x00, 0x80]);
        b.iter(|| {
            black_box(&mut nes).step();
        });
    });

    group.finish();
}

fn bench_full_machine(c: &mut Criterion) {
    c.bench_function("run_1000_cycles", |b| {
        let mut nes = test_machine(&[0x4C, 0x00, 0x80]);
        b.iter(|| {
            black_box(&mut nes).run_cycles(1000);
        });
    });
}

criterion_group!(benches, bench_cpu_instructions, bench_full_machine);
criterion_main!(benches);
