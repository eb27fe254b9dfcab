//! Store Benchmarks
//!
//! Single-threaded operation latency, concurrent mixed workloads across
//! segment counts, and writes against a budget small enough that most of
//! them trigger eviction.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use memdb::{Store, StoreConfig};
use std::sync::Arc;
use std::thread;

const KEY_COUNT: usize = 10_000;
const OPS_PER_THREAD: usize = 1_000;

fn keys() -> Vec<String> {
    (0..KEY_COUNT).map(|i| format!("key{i}")).collect()
}

fn populated(segments: usize) -> Store {
    let store = Store::init(StoreConfig::new().with_segments(segments));
    for (i, key) in keys().iter().enumerate() {
        store.set(key, &i.to_string(), 0);
    }
    for i in 0..1_000 {
        store.zadd("board", f64::from(i), &format!("player{i}"));
    }
    store
}

/// Benchmark each operation on a warm store from one thread
fn single_thread_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("Store Operations");
    let store = populated(16);
    let keys = keys();

    group.bench_function("GET hit", |b| {
        b.iter(|| {
            for key in keys.iter().take(100) {
                black_box(store.get(key));
            }
        });
    });

    group.bench_function("GET miss", |b| {
        b.iter(|| {
            for i in 0..100 {
                black_box(store.get(&format!("absent{i}")));
            }
        });
    });

    group.bench_function("SET replace", |b| {
        b.iter(|| {
            for key in keys.iter().take(100) {
                store.set(key, "replacement", 0);
            }
        });
    });

    group.bench_function("INCR", |b| {
        b.iter(|| {
            for i in 0..100 {
                black_box(store.incr(&format!("counter{}", i % 10)));
            }
        });
    });

    group.bench_function("ZADD", |b| {
        let mut score = 0.0;
        b.iter(|| {
            for _ in 0..100 {
                score += 1.0;
                store.zadd("bench", score % 5_000.0, "member");
            }
        });
    });

    group.bench_function("ZRANK", |b| {
        b.iter(|| black_box(store.zrank("board", "player500")));
    });

    group.bench_function("ZRANGE 0..=9", |b| {
        b.iter(|| black_box(store.zrange("board", 0, 9)));
    });

    group.finish();
}

/// Benchmark an 80/20 read/write mix from 8 threads across segment counts
fn concurrent_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("Concurrent Mixed");
    group.throughput(Throughput::Elements((8 * OPS_PER_THREAD) as u64));

    for segments in [1, 4, 16, 64] {
        let store = Arc::new(populated(segments));
        group.bench_with_input(BenchmarkId::from_parameter(segments), &segments, |b, _| {
            b.iter(|| run_concurrent_mixed(Arc::clone(&store), 8, OPS_PER_THREAD));
        });
    }

    group.finish();
}

/// Benchmark writes that mostly have to evict first
fn eviction_heavy(c: &mut Criterion) {
    let mut group = c.benchmark_group("Eviction");
    group.throughput(Throughput::Elements(OPS_PER_THREAD as u64));

    group.bench_function("scalar LRU", |b| {
        let store = Store::init(StoreConfig::new().with_max_memory(16 * 1024).with_segments(8));
        let mut n = 0usize;
        b.iter(|| {
            for _ in 0..OPS_PER_THREAD {
                n += 1;
                store.set(&format!("key{n}"), "0123456789abcdef", 0);
            }
        });
    });

    group.bench_function("collection lowest score", |b| {
        let store = Store::init(StoreConfig::new().with_max_memory(16 * 1024).with_segments(8));
        let mut n = 0u32;
        b.iter(|| {
            for _ in 0..OPS_PER_THREAD {
                n = n.wrapping_add(1);
                store.zadd(&format!("z{}", n % 8), f64::from(n), "member");
            }
        });
    });

    group.finish();
}

fn run_concurrent_mixed(store: Arc<Store>, num_threads: usize, ops_per_thread: usize) {
    let mut handles = Vec::with_capacity(num_threads);
    for t in 0..num_threads {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..ops_per_thread {
                let key = format!("key{}", (t * ops_per_thread + i) % KEY_COUNT);
                match i % 10 {
                    0 => store.set(&key, "value", 0),
                    1 => {
                        black_box(store.incr(&key));
                    }
                    _ => {
                        black_box(store.get(&key));
                    }
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

criterion_group!(benches, single_thread_ops, concurrent_mixed, eviction_heavy);
criterion_main!(benches);
