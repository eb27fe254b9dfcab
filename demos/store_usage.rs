//! Store Usage Examples
//!
//! Walks through scalar keys, sorted collections, eviction under a small
//! memory budget and sharing one store between threads.
//!
//! Run with: cargo run --example store_usage

extern crate memdb;

use memdb::{LruPolicy, RandomLowestScore, Store, StoreConfig, StoreMetrics};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    println!("memdb Usage Examples");
    println!("====================\n");

    scalar_keys();
    println!();

    sorted_collections();
    println!();

    bounded_memory();
    println!();

    shared_between_threads();
}

/// SET / GET / DEL / INCR and lazy expiry
fn scalar_keys() {
    println!("1. Scalar Keys");
    println!("   -----------");

    let store = Store::new();
    store.set("greeting", "hello", 0);
    println!("   GET greeting -> {:?}", store.get("greeting"));

    store.incr("visits");
    store.incr("visits");
    println!("   INCR visits twice -> {:?}", store.get("visits"));

    store.set_with_ttl("session", "abc", Some(Duration::from_millis(50)));
    println!("   DBSIZE with session -> {}", store.db_size());
    thread::sleep(Duration::from_millis(80));
    println!("   GET session after 80ms -> {:?}", store.get("session"));
    println!("   DBSIZE after expiry observed -> {}", store.db_size());

    println!("   DEL greeting -> {}", store.del("greeting"));
}

/// ZADD / ZCARD / ZRANK / ZRANGE
fn sorted_collections() {
    println!("2. Sorted Collections");
    println!("   ------------------");

    let store = Store::new();
    for (score, player) in [(320.0, "carol"), (150.0, "alice"), (275.5, "bob")] {
        store.zadd("leaderboard", score, player);
    }

    println!("   ZCARD -> {}", store.zcard("leaderboard"));
    println!("   ZRANK bob -> {:?}", store.zrank("leaderboard", "bob"));
    println!("   ZRANGE 0 1 -> {:?}", store.zrange("leaderboard", 0, 1));

    // a second member at an existing score takes its place
    store.zadd("leaderboard", 150.0, "dave");
    println!(
        "   after ZADD 150 dave -> {:?}",
        store.zrange("leaderboard", 0, 10)
    );
}

/// Writes past the budget evict the least recently used key first
fn bounded_memory() {
    println!("3. Bounded Memory");
    println!("   --------------");

    let store = Store::with_policies(
        StoreConfig::new().with_max_memory(100).with_segments(4),
        LruPolicy::new(),
        RandomLowestScore::with_seed(7),
    );

    for i in 0..10 {
        store.set(&format!("key{i}"), "0123456789", 0);
        store.get("key0");
    }

    let stats = store.stats();
    println!(
        "   memory {}/{} bytes, {} keys",
        store.memory_used(),
        store.max_memory(),
        store.db_size()
    );
    println!("   scalar evictions: {}", stats.scalar_evictions);
    println!("   key0 kept by reads: {}", store.get("key0").is_some());
    println!("   key1 evicted: {}", store.get("key1").is_none());
}

/// One store, several writer threads
fn shared_between_threads() {
    println!("4. Shared Between Threads");
    println!("   ----------------------");

    let store = Arc::new(Store::new());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..1_000 {
                    store.incr("hits");
                    store.zadd("events", f64::from(t * 1_000 + i), "tick");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    println!("   hits -> {:?}", store.get("hits"));
    println!("   events -> {}", store.zcard("events"));

    let metrics = store.metrics();
    println!(
        "   writes: {}, eviction policy: {}",
        metrics["writes"],
        store.policy_name()
    );
}
