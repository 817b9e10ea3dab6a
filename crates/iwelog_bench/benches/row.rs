//! Row format and naming benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use iwelog_bench::random_record;
use iwelog_core::{increment_id_in_name, SegmentRow, SequenceNumber};

/// Benchmark row encoding.
fn bench_row_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_encode");

    for size in [64, 1024, 16384].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let row = SegmentRow::from_record(&random_record(size), SequenceNumber::new(1), 0);

            b.iter(|| {
                black_box(black_box(&row).encode());
            });
        });
    }

    group.finish();
}

/// Benchmark row decoding with checksum verification.
fn bench_row_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_decode");

    for size in [64, 1024, 16384].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let encoded =
                SegmentRow::from_record(&random_record(size), SequenceNumber::new(1), 0).encode();

            b.iter(|| {
                let row = SegmentRow::decode(black_box(&encoded), "logI_1", 0).unwrap();
                black_box(row);
            });
        });
    }

    group.finish();
}

/// Benchmark segment name increment.
fn bench_increment_name(c: &mut Criterion) {
    c.bench_function("increment_id_in_name", |b| {
        b.iter(|| {
            let next = increment_id_in_name(black_box("logW_99999")).unwrap();
            black_box(next);
        });
    });
}

criterion_group!(
    benches,
    bench_row_encode,
    bench_row_decode,
    bench_increment_name,
);
criterion_main!(benches);
