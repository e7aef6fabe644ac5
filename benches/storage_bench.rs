//! Benchmarks for sablekv storage operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sablekv::{Config, Engine};
use tempfile::TempDir;

fn storage_benchmarks(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .memtable_size(1_000_000)
        .build();
    let engine = Engine::open(config).unwrap();

    // Write path: WAL append + fsync + memtable insert
    let mut next = 0u64;
    c.bench_function("put_small_value", |b| {
        b.iter(|| {
            let key = format!("key{:012}", next);
            next += 1;
            engine.put(key.as_bytes(), b"value").unwrap();
        })
    });

    engine.put(b"hot", b"value").unwrap();
    c.bench_function("get_memtable_hit", |b| {
        b.iter(|| engine.get(black_box(b"hot")).unwrap())
    });

    // Same key after a flush: served from the SSTable index instead
    engine.flush().unwrap();
    c.bench_function("get_sstable_hit", |b| {
        b.iter(|| engine.get(black_box(b"hot")).unwrap())
    });

    c.bench_function("get_range_hundred_keys", |b| {
        b.iter(|| {
            engine
                .get_range(black_box(b"key000000000000"), black_box(b"key000000000099"))
                .unwrap()
        })
    });
}

criterion_group!(benches, storage_benchmarks);
criterion_main!(benches);
