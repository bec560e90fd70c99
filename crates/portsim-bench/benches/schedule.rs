//! Criterion benchmarks for evaluation order resolution.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use portsim_core::SystemId;
use portsim_engine::Schedule;

/// A reversed chain plus a fan-in every tenth system.
fn edges(n: u32) -> Vec<(SystemId, SystemId)> {
    let mut edges: Vec<_> = (1..n).map(|i| (SystemId(i), SystemId(i - 1))).collect();
    edges.extend((10..n).step_by(10).map(|i| (SystemId(i), SystemId(0))));
    edges
}

fn bench_resolve_1000(c: &mut Criterion) {
    let deps = edges(1000);
    c.bench_function("schedule_resolve_1000", |b| {
        b.iter(|| {
            let schedule =
                Schedule::resolve(1000, deps.iter().copied(), |id| id.to_string()).unwrap();
            black_box(&schedule);
        });
    });
}

fn bench_adder_chain_build(c: &mut Criterion) {
    c.bench_function("adder_chain_1000_build", |b| {
        b.iter(|| {
            let mut sim = portsim_bench::adder_chain(1000).unwrap();
            black_box(sim.build().unwrap().len());
        });
    });
}

criterion_group!(benches, bench_resolve_1000, bench_adder_chain_build);
criterion_main!(benches);
