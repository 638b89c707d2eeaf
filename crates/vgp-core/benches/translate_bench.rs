//! Criterion benchmarks for the state translator.
//!
//! Run with:
//! ```bash
//! cargo bench --package vgp-core --bench translate_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vgp_core::{
    translate, GamepadButton, GamepadReading, MappingTable, OutputMode, Stick, ThumbstickMapping,
    TranslateOptions, TranslatorState,
};

/// A short play session: press, hold with the stick deflected, release.
fn session() -> Vec<GamepadReading> {
    let mut readings = vec![GamepadReading::pressing(GamepadButton::A)];
    for i in 0..30 {
        let x = (i as f32 / 30.0) * 2.0 - 1.0;
        readings.push(GamepadReading {
            left_stick_x: x,
            left_stick_y: -x,
            right_stick_x: x,
            right_stick_y: 0.8,
            ..GamepadReading::default()
        });
    }
    readings.push(GamepadReading::releasing(GamepadButton::A));
    readings
}

fn run(readings: &[GamepadReading], table: &MappingTable, options: TranslateOptions) -> usize {
    let mut state = TranslatorState::default();
    let mut emitted = 0;
    for r in readings {
        let (cmds, next) = translate(&state, r, table, options);
        emitted += cmds.len();
        state = next;
    }
    emitted
}

fn bench_translate(c: &mut Criterion) {
    let readings = session();
    let digital = MappingTable::default();
    let mut pointer = MappingTable::default();
    pointer.set_stick(
        Stick::Right,
        ThumbstickMapping::pointer(12.0).expect("valid sensitivity"),
    );
    let kbm = TranslateOptions::default();
    let pad = TranslateOptions {
        mode: OutputMode::Gamepad,
        ..TranslateOptions::default()
    };

    let mut group = c.benchmark_group("translate_session");
    group.bench_function("digital_sticks", |b| {
        b.iter(|| run(black_box(&readings), &digital, kbm))
    });
    group.bench_function("pointer_stick", |b| {
        b.iter(|| run(black_box(&readings), &pointer, kbm))
    });
    group.bench_function("gamepad_mode", |b| {
        b.iter(|| run(black_box(&readings), &digital, pad))
    });
    group.finish();
}

criterion_group!(benches, bench_translate);
criterion_main!(benches);
