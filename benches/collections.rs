//! Benchmarks comparing the ordex collections to standard library collections.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ordex::collections::{FastMap, FastTable};
use ordex::order;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

fn generate_keys(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("user:{:08}", i)).collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [1_000, 10_000, 100_000].iter() {
        let keys = generate_keys(*size);

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), size, |b, _| {
            b.iter(|| {
                let mut map: BTreeMap<String, u64> = BTreeMap::new();
                for (i, key) in keys.iter().enumerate() {
                    map.insert(key.clone(), i as u64);
                }
                black_box(map)
            });
        });

        group.bench_with_input(BenchmarkId::new("HashMap", size), size, |b, _| {
            b.iter(|| {
                let mut map: HashMap<String, u64> = HashMap::new();
                for (i, key) in keys.iter().enumerate() {
                    map.insert(key.clone(), i as u64);
                }
                black_box(map)
            });
        });

        group.bench_with_input(BenchmarkId::new("FastMap/hash", size), size, |b, _| {
            b.iter(|| {
                let mut map: FastMap<String, u64> = FastMap::new();
                for (i, key) in keys.iter().enumerate() {
                    map.insert(key.clone(), i as u64);
                }
                black_box(map)
            });
        });

        group.bench_with_input(BenchmarkId::new("FastMap/lexical", size), size, |b, _| {
            b.iter(|| {
                let mut map = FastMap::with_order(order::lexical::<String>());
                for (i, key) in keys.iter().enumerate() {
                    map.insert(key.clone(), i as u64);
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for size in [1_000, 10_000, 100_000].iter() {
        let keys = generate_keys(*size);

        let btree: BTreeMap<String, u64> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), i as u64))
            .collect();

        let hashed: FastMap<String, u64> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), i as u64))
            .collect();

        let mut lexical = FastMap::with_order(order::lexical::<String>());
        lexical.extend(keys.iter().enumerate().map(|(i, key)| (key.clone(), i as u64)));

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), size, |b, _| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in keys.iter() {
                    if let Some(v) = btree.get(key) {
                        sum += v;
                    }
                }
                black_box(sum)
            });
        });

        group.bench_with_input(BenchmarkId::new("FastMap/hash", size), size, |b, _| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in keys.iter() {
                    if let Some(v) = hashed.get(key) {
                        sum += v;
                    }
                }
                black_box(sum)
            });
        });

        group.bench_with_input(BenchmarkId::new("FastMap/lexical", size), size, |b, _| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in keys.iter() {
                    if let Some(v) = lexical.get(key) {
                        sum += v;
                    }
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

fn bench_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("range");

    for size in [1_000, 10_000, 100_000].iter() {
        let table: FastTable<u32> = (0..*size as u32).rev().collect();
        let btree: BTreeMap<u32, ()> = (0..*size as u32).map(|v| (v, ())).collect();
        let (lo, hi) = (*size as u32 / 4, *size as u32 / 2);

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), size, |b, _| {
            b.iter(|| black_box(btree.range(lo..hi).count()));
        });

        group.bench_with_input(BenchmarkId::new("FastTable/slice", size), size, |b, _| {
            b.iter(|| black_box(table.range(&lo..&hi).len()));
        });

        group.bench_with_input(BenchmarkId::new("FastTable/view", size), size, |b, _| {
            b.iter(|| {
                let view = table.view().range(Bound::Included(lo), Bound::Excluded(hi));
                black_box(view.iter().count())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup, bench_range);
criterion_main!(benches);
