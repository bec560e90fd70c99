//! Criterion benchmarks for the stepping loop.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use portsim_bench::{adder_chain, oscillator_bank, vector_chain};

fn bench_adder_chain_100(c: &mut Criterion) {
    let mut sim = adder_chain(100).unwrap();
    // Resolve the schedule and run pre_sim outside the measurement.
    sim.simulate(0.1, 0.1).unwrap();

    c.bench_function("adder_chain_100_step", |b| {
        b.iter(|| {
            let stats = sim.simulate(0.1, 0.1).unwrap();
            black_box(&stats);
        });
    });
}

fn bench_vector_chain_100(c: &mut Criterion) {
    let mut sim = vector_chain(100).unwrap();
    sim.simulate(0.1, 0.1).unwrap();

    c.bench_function("vector_chain_100_step", |b| {
        b.iter(|| {
            let stats = sim.simulate(0.1, 0.1).unwrap();
            black_box(&stats);
        });
    });
}

fn bench_oscillators_1000_steps(c: &mut Criterion) {
    c.bench_function("oscillator_bank_10_x_1000_steps", |b| {
        b.iter(|| {
            let mut sim = oscillator_bank(10).unwrap();
            let stats = sim.simulate(1.0, 0.001).unwrap();
            black_box(&stats);
        });
    });
}

criterion_group!(
    benches,
    bench_adder_chain_100,
    bench_vector_chain_100,
    bench_oscillators_1000_steps
);
criterion_main!(benches);
