//! Store append benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use iwelog_bench::{generate_records, random_severities};
use iwelog_core::{Capacities, Config, LogStore, Severity};
use tempfile::TempDir;

fn memory_store(capacities: Capacities) -> LogStore {
    let store =
        LogStore::open_in_memory(Config::default().capacities(capacities).sync_on_append(false))
            .unwrap();
    store.initialize().unwrap();
    store
}

/// Benchmark appends that never rotate.
fn bench_memory_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_append");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let store = memory_store(Capacities::uniform(u64::MAX));
            let records = generate_records(64, size);
            let mut n = 0usize;

            b.iter(|| {
                let outcome = store
                    .append(Severity::Info, black_box(&records[n % records.len()]))
                    .unwrap();
                n += 1;
                black_box(outcome);
            });
        });
    }

    group.finish();
}

/// Benchmark appends with frequent rotation.
fn bench_rotating_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("rotating_append");

    for capacity in [10u64, 100, 1_000].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            capacity,
            |b, &capacity| {
                let store = memory_store(Capacities::uniform(capacity));
                let records = generate_records(64, 128);
                let severities = random_severities(1024);
                let mut n = 0usize;

                b.iter(|| {
                    let outcome = store
                        .append(
                            severities[n % severities.len()],
                            black_box(&records[n % records.len()]),
                        )
                        .unwrap();
                    n += 1;
                    black_box(outcome);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark file-backed appends.
fn bench_file_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_append");

    // Use larger sample size for file operations
    group.sample_size(50);

    for sync in [false, true].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("sync", sync),
            sync,
            |b, &sync| {
                let temp_dir = TempDir::new().unwrap();
                let store = LogStore::open(
                    temp_dir.path(),
                    Config::default()
                        .capacities(Capacities::uniform(10_000))
                        .sync_on_append(sync),
                )
                .unwrap();
                store.initialize().unwrap();
                let records = generate_records(64, 256);
                let mut n = 0usize;

                b.iter(|| {
                    let outcome = store
                        .append(Severity::Error, black_box(&records[n % records.len()]))
                        .unwrap();
                    n += 1;
                    black_box(outcome);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_memory_append,
    bench_rotating_append,
    bench_file_append,
);
criterion_main!(benches);
