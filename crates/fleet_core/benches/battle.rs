//! Battle resolution benchmarks for fleet_core.
//!
//! Run with: `cargo bench -p fleet_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fleet_core::battle::simulate;
use fleet_core::record::BattleInput;
use fleet_core::rng::BattleRng;
use fleet_test_utils::fixtures::{cannon, rift_cannon, skirmish, ShipBuilder};

fn line(ships: usize) -> Vec<fleet_core::ship::ShipSnapshot> {
    (0..ships)
        .map(|i| {
            ShipBuilder::new("Frigate")
                .size(u8::try_from(i % 3 + 1).unwrap_or(1))
                .init(i32::try_from(i % 4).unwrap_or(0))
                .hull_cap(6)
                .part(cannon("laser", 2, 1))
                .part(rift_cannon(u32::from(i % 5 == 0)))
                .build()
        })
        .collect()
}

/// Runs battle benchmarks for the fleet_core crate.
pub fn battle_benchmark(c: &mut Criterion) {
    c.bench_function("skirmish", |b| {
        b.iter(|| simulate(black_box(&skirmish(7))));
    });

    let mut group = c.benchmark_group("fleet_size");
    for ships in [4usize, 16, 64] {
        let input = BattleInput::new(11, line(ships), line(ships));
        group.bench_with_input(BenchmarkId::from_parameter(ships), &input, |b, input| {
            b.iter(|| simulate(black_box(input)));
        });
    }
    group.finish();

    c.bench_function("rng_roll_die", |b| {
        let mut rng = BattleRng::new(3);
        b.iter(|| black_box(rng.roll_die(6)));
    });
}

criterion_group!(benches, battle_benchmark);
criterion_main!(benches);
