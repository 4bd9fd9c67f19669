use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use persistent_hash_trie::TrieMap;

/// Benchmark single insert into an existing dataset of varying size
fn bench_single_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_insert");

    for size in [100u64, 1_000, 10_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::new("TrieMap", size), size, |b, &size| {
            let mut map = TrieMap::new();
            for i in 0..size {
                map.insert(i, i);
            }
            let next_key = size;

            b.iter(|| {
                black_box(map.insert(next_key, next_key));
                map.remove(&next_key); // Clean up for next iteration
            });
        });

        group.bench_with_input(BenchmarkId::new("HashMap", size), size, |b, &size| {
            let mut map = HashMap::new();
            for i in 0..size {
                map.insert(i, i);
            }
            let next_key = size;

            b.iter(|| {
                black_box(map.insert(next_key, next_key));
                map.remove(&next_key); // Clean up for next iteration
            });
        });
    }

    group.finish();
}

/// Benchmark single lookup with varying dataset sizes
fn bench_single_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_lookup");

    for size in [100u64, 1_000, 10_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::new("TrieMap_hit", size), size, |b, &size| {
            let mut map = TrieMap::new();
            for i in 0..size {
                map.insert(i, i);
            }
            let lookup_key = size / 2;

            b.iter(|| black_box(map.get(&lookup_key)));
        });

        group.bench_with_input(BenchmarkId::new("HashMap_hit", size), size, |b, &size| {
            let mut map = HashMap::new();
            for i in 0..size {
                map.insert(i, i);
            }
            let lookup_key = size / 2;

            b.iter(|| black_box(map.get(&lookup_key)));
        });

        group.bench_with_input(BenchmarkId::new("TrieMap_miss", size), size, |b, &size| {
            let mut map = TrieMap::new();
            for i in 0..size {
                map.insert(i, i);
            }
            let lookup_key = size + 1000;

            b.iter(|| black_box(map.get(&lookup_key)));
        });
    }

    group.finish();
}

/// Benchmark the snapshot-then-mutate pattern the trie is built for
fn bench_snapshot_mutation(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_mutation");

    for size in [1_000u64, 10_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::new("TrieMap", size), size, |b, &size| {
            let mut map = TrieMap::new();
            for i in 0..size {
                map.insert(i, i);
            }

            // Clone is O(1); insert copies one path.
            b.iter(|| {
                let snapshot = map.clone();
                let mut next = snapshot.clone();
                next.insert(size, size);
                black_box(next);
            });
        });

        group.bench_with_input(BenchmarkId::new("HashMap", size), size, |b, &size| {
            let mut map = HashMap::new();
            for i in 0..size {
                map.insert(i, i);
            }

            // The only way to snapshot a HashMap is a full copy.
            b.iter(|| {
                let snapshot = map.clone();
                let mut next = snapshot.clone();
                next.insert(size, size);
                black_box(next);
            });
        });
    }

    group.finish();
}

/// Benchmark iteration over the whole map
fn bench_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration");

    for size in [1_000u64, 100_000].iter() {
        group.bench_with_input(BenchmarkId::new("TrieMap", size), size, |b, &size| {
            let mut map = TrieMap::new();
            for i in 0..size {
                map.insert(i, i);
            }

            b.iter(|| {
                let mut sum = 0u64;
                for (_, value) in &map {
                    sum = sum.wrapping_add(*value);
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_insert,
    bench_single_lookup,
    bench_snapshot_mutation,
    bench_iteration
);
criterion_main!(benches);
