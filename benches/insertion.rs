use std::{hint::black_box, time::Instant};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lontar::{Row, Table};
use tempfile::TempDir;

const DATASET_SIZES: &[usize] = &[100, 1_000, 5_000];

fn bench_row(key: u64) -> Row {
    Row::new(key, format!("user{key}"), format!("user{key}@example.com"))
}

fn populate(table: &mut Table, count: usize) {
    for key in 1..=count as u64 {
        table.insert(&bench_row(key)).unwrap();
    }
}

fn benchmark_insert_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_throughput");
    for &size in DATASET_SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_custom(|iters| {
                let mut total = std::time::Duration::ZERO;
                for _ in 0..iters {
                    let dir = TempDir::new().unwrap();
                    let mut table = Table::open(dir.path().join("bench.db")).unwrap();
                    let start = Instant::now();
                    populate(&mut table, size);
                    total += start.elapsed();
                    table.close().unwrap();
                }
                total
            });
        });
    }
    group.finish();
}

fn benchmark_scan_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_throughput");
    for &size in DATASET_SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_custom(|iters| {
                let dir = TempDir::new().unwrap();
                let mut table = Table::open(dir.path().join("bench.db")).unwrap();
                populate(&mut table, size);
                let mut total = std::time::Duration::ZERO;
                for _ in 0..iters {
                    let start = Instant::now();
                    let mut count = 0;
                    for row in table.select().unwrap() {
                        black_box(row.unwrap());
                        count += 1;
                    }
                    total += start.elapsed();
                    assert_eq!(count, size);
                }
                total
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_insert_throughput,
    benchmark_scan_throughput
);
criterion_main!(benches);
