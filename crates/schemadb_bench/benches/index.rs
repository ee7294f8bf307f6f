//! Partial-key index benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use schemadb_bench::utils::generate_keys;
use schemadb_core::PartialKeyIndex;

/// Benchmark building an index from scratch, as done on every load.
fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_rebuild");

    for count in [100, 1000, 10_000].iter() {
        let keys = generate_keys(*count);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &keys, |b, keys| {
            b.iter(|| black_box(PartialKeyIndex::rebuild(5, keys)));
        });
    }
    group.finish();
}

/// Benchmark lookups shorter and longer than the prefix length.
fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_lookup");
    let keys = generate_keys(10_000);
    let index = PartialKeyIndex::rebuild(5, &keys);
    let long: String = keys[keys.len() / 3].chars().take(8).collect();

    group.bench_function("short_partial", |b| {
        b.iter(|| black_box(index.lookup(black_box("Al"))));
    });
    group.bench_function("long_partial", |b| {
        b.iter(|| black_box(index.lookup(black_box(&long))));
    });
    group.bench_function("miss", |b| {
        b.iter(|| black_box(index.lookup(black_box("Zzzzzz"))));
    });
    group.finish();
}

criterion_group!(benches, bench_rebuild, bench_lookup);
criterion_main!(benches);
