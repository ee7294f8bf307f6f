//! Storage engine benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use schemadb_bench::utils::{generate_keys, user_json};
use schemadb_core::{Config, StorageEngine};
use tempfile::TempDir;

fn populated(count: usize) -> (StorageEngine, Vec<String>) {
    let engine = StorageEngine::open_in_memory(Config::default()).unwrap();
    engine
        .create_schema("User", "name:string age:int email:string active:bool")
        .unwrap();
    let keys = generate_keys(count);
    for key in &keys {
        engine.add_record("User", &user_json(key)).unwrap();
    }
    (engine, keys)
}

/// Benchmark adding a record to databases of increasing size.
///
/// Every add saves the whole database, so cost grows with record count.
fn bench_add_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_record");

    for count in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("memory", count), count, |b, &count| {
            let (engine, _) = populated(count);
            let json = user_json("Zed");
            b.iter(|| engine.add_record("User", black_box(&json)).unwrap());
        });
    }

    group.bench_function("file_100", |b| {
        let temp = TempDir::new().unwrap();
        let config = Config::new().root(temp.path()).sync_on_save(false);
        let engine = StorageEngine::open(config).unwrap();
        engine.create_schema("User", "name:string age:int").unwrap();
        for key in generate_keys(100) {
            engine.add_record("User", &user_json(&key)).unwrap();
        }
        let json = user_json("Zed");
        b.iter(|| engine.add_record("User", black_box(&json)).unwrap());
    });

    group.finish();
}

/// Benchmark exact and partial reads.
fn bench_get_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_record");
    let (engine, keys) = populated(1000);
    let exact = keys[keys.len() / 2].clone();
    let unique_partial: String = exact.chars().take(8).collect();

    group.bench_function("exact", |b| {
        b.iter(|| engine.get_record("User", black_box(&exact)).unwrap());
    });
    group.bench_function("partial_unique", |b| {
        b.iter(|| engine.get_record("User", black_box(&unique_partial)).unwrap());
    });
    group.bench_function("partial_ambiguous", |b| {
        b.iter(|| engine.get_record("User", black_box("Ali")).unwrap_err());
    });

    group.finish();
}

/// Benchmark listing all records of a schema.
fn bench_list_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_records");

    for count in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (engine, _) = populated(count);
            b.iter(|| black_box(engine.list_records("User").unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_add_record, bench_get_record, bench_list_records);
criterion_main!(benches);
