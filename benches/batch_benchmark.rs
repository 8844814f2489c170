use calorie_tracker::db::{BatchAccumulator, CollectionPath, MemoryStore, Write};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use serde_json::json;
use std::hint::black_box;

/// One reset write per usage record, as the daily counter reset stages them.
fn reset_writes(n: usize) -> Vec<Write> {
    let collection = CollectionPath::root("usage_limits");
    (0..n)
        .map(|i| {
            Write::update(
                collection.doc(format!("user{i:05}")),
                [
                    ("count", json!(0)),
                    ("lastReset", json!("2024-06-01T00:00:00Z")),
                ],
            )
        })
        .collect()
}

fn benchmark_batching(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_accumulator");

    group.bench_function("stage_10000_single_writes", |b| {
        b.iter_batched(
            || reset_writes(10_000),
            |writes| {
                let mut batch = BatchAccumulator::new(499);
                for write in writes {
                    batch.stage(write);
                }
                black_box(batch.groups().len())
            },
            BatchSize::LargeInput,
        )
    });

    group.bench_function("stage_10000_writes_in_units_of_3", |b| {
        b.iter_batched(
            || reset_writes(10_000),
            |writes| {
                let mut batch = BatchAccumulator::new(499);
                let mut writes = writes.into_iter().peekable();
                while writes.peek().is_some() {
                    let unit: Vec<_> = writes.by_ref().take(3).collect();
                    batch.stage_atomic(unit).expect("unit fits in a group");
                }
                black_box(batch.groups().len())
            },
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn benchmark_commit(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    let collection = CollectionPath::root("usage_limits");

    c.bench_function("commit_5000_to_memory_store", |b| {
        b.iter_batched(
            || {
                let store = MemoryStore::new();
                for i in 0..5_000 {
                    store.seed(&collection.doc(format!("user{i:05}")), &json!({"count": 4}));
                }
                let mut batch = BatchAccumulator::new(499);
                for write in reset_writes(5_000) {
                    batch.stage(write);
                }
                (store, batch)
            },
            |(store, batch)| {
                let summary = runtime
                    .block_on(batch.commit(&store))
                    .expect("commit failed");
                black_box(summary.operations)
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, benchmark_batching, benchmark_commit);
criterion_main!(benches);
