//! Benchmarks a single `analyze()` pass at increasing slot counts over a
//! fixed-size in-memory dataset.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use queryosity::datasets::InMemoryDataset;
use queryosity::queries::Sum;
use queryosity::Dataflow;

const ROWS: u64 = 200_000;

fn dataset() -> InMemoryDataset {
    let pt: Vec<f64> = (0..ROWS).map(|i| (i % 100) as f64).collect();
    let is_muon: Vec<bool> = (0..ROWS).map(|i| i % 3 == 0).collect();
    InMemoryDataset::new(ROWS).with_column("pt", pt).with_column("is_muon", is_muon)
}

fn run_once(concurrency: usize) -> f64 {
    let flow = Dataflow::with_concurrency(dataset(), concurrency, None).expect("build dataflow");
    let pt = flow.read::<f64>("pt").expect("read pt");
    let is_muon = flow.read::<bool>("is_muon").expect("read is_muon");
    let root = flow.root().expect("root selection");
    let muons = flow.filter1("muons", |m: &bool| *m).apply(Some(&root), &is_muon).expect("apply filter");
    let sum = flow.book0(Sum::new).fill1(&pt).at(&muons);
    sum.result().expect("merge result")
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_single_pass");
    for concurrency in [1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(concurrency), &concurrency, |b, &concurrency| {
            b.iter(|| black_box(run_once(concurrency)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_analyze);
criterion_main!(benches);
