//! Benchmarks for pipeline execution.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;

use conveyor::core::Record;
use conveyor::pipeline::{Pipeline, PipelineConfig};
use conveyor::sinks::MemorySink;
use conveyor::testing::VecSource;

fn records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|n| Record::new(format!("record-{n}"), format!("payload-{n}")))
        .collect()
}

fn run_once(records: Vec<Record>, workers: usize) -> u64 {
    let sink = Arc::new(MemorySink::new());
    let config = PipelineConfig::new().with_workers(workers);
    let mut pipeline = Pipeline::new(VecSource::new(records), sink, config);
    pipeline.run(None).map(|stats| stats.inserted).unwrap_or(0)
}

fn pipeline_benchmark(c: &mut Criterion) {
    let input = records(1_000);

    c.bench_function("inline_1k_records", |b| {
        b.iter(|| run_once(black_box(input.clone()), 1));
    });

    c.bench_function("parallel_4_workers_1k_records", |b| {
        b.iter(|| run_once(black_box(input.clone()), 4));
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
