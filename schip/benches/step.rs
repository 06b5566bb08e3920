use criterion::{black_box, criterion_group, criterion_main, Criterion};

use schip::prelude::*;

/// Endless loop that draws a random 8x4 sprite at a random position.
#[rustfmt::skip]
const PROGRAM: &[u8] = &[
    0xA2, 0x10, // LD I, .sprite
    0xC0, 0x3F, // RND v0, 3F
    0xC1, 0x1F, // RND v1, 1F
    0xD0, 0x14, // DRW v0, v1, 4
    0x82, 0x04, // ADD v2, v0
    0x83, 0x15, // SUB v3, v1
    0xF2, 0x33, // LD B, v2
    0x12, 0x02, // JP 202
    // .sprite
    0b11111111,
    0b10000001,
    0b10000001,
    0b11111111,
];

fn criterion_benchmark(c: &mut Criterion) {
    let mut vm = Chip8Vm::new(Chip8Conf {
        cycles_per_step: 1000,
        rng_seed: Some(42),
        ..Chip8Conf::default()
    });
    vm.load_program(PROGRAM).unwrap();

    c.bench_function("draw loop step", |b| {
        b.iter(|| black_box(vm.step()))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
