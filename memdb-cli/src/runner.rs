//! Load runner
//!
//! Drives one shared [`Store`] from several worker threads. Each worker owns a
//! [`WorkloadGenerator`] and a set of per-operation latency trackers; trackers
//! are merged once all workers have finished, so the measured path holds no
//! shared state beyond the store itself.
//!
//! Latency is measured around the store call only. Operation generation is
//! outside the timed section.

use std::collections::BTreeMap;
use std::hint::black_box;
use std::panic;
use std::thread;
use std::time::Instant;

use memdb::{Store, StoreConfig, StoreMetrics};
use tracing::{debug, info};

use crate::generator::WorkloadGenerator;
use crate::models::{LatencyPercentiles, LoadConfig, LoadResult, OpKind, OpLatencyStats, Operation};

/// Maximum latency samples kept per operation kind per worker
const MAX_SAMPLES: usize = 5000;

/// Tracks latency for a single operation kind
#[derive(Debug, Clone)]
struct OpLatencyTracker {
    /// Total time spent (nanoseconds)
    total_ns: u64,
    /// Number of operations
    count: u64,
    /// Minimum latency (nanoseconds)
    min_ns: u64,
    /// Maximum latency (nanoseconds)
    max_ns: u64,
    /// Sample reservoir for percentile calculation
    samples: Vec<u64>,
}

impl OpLatencyTracker {
    fn new() -> Self {
        Self {
            total_ns: 0,
            count: 0,
            min_ns: u64::MAX,
            max_ns: 0,
            samples: Vec::new(),
        }
    }

    #[inline]
    fn record(&mut self, latency_ns: u64) {
        self.total_ns += latency_ns;
        self.count += 1;
        self.min_ns = self.min_ns.min(latency_ns);
        self.max_ns = self.max_ns.max(latency_ns);

        // Reservoir sampling for percentiles
        if self.samples.len() < MAX_SAMPLES {
            self.samples.push(latency_ns);
        } else {
            let slot = rand::random::<u64>() % self.count;
            if let Ok(slot) = usize::try_from(slot) {
                if slot < MAX_SAMPLES {
                    self.samples[slot] = latency_ns;
                }
            }
        }
    }

    fn merge(&mut self, other: OpLatencyTracker) {
        self.total_ns += other.total_ns;
        self.count += other.count;
        self.min_ns = self.min_ns.min(other.min_ns);
        self.max_ns = self.max_ns.max(other.max_ns);
        self.samples.extend(other.samples);
    }

    fn percentiles(&mut self) -> Option<LatencyPercentiles> {
        if self.samples.is_empty() {
            return None;
        }

        self.samples.sort_unstable();
        let len = self.samples.len();

        Some(LatencyPercentiles {
            p50_ns: self.samples[len * 50 / 100],
            p90_ns: self.samples[len * 90 / 100],
            p99_ns: self.samples[len * 99 / 100],
        })
    }

    fn finalize(mut self) -> OpLatencyStats {
        OpLatencyStats {
            total_ns: self.total_ns,
            count: self.count,
            min_ns: if self.min_ns == u64::MAX {
                0
            } else {
                self.min_ns
            },
            max_ns: self.max_ns,
            percentiles: self.percentiles(),
        }
    }
}

fn new_trackers() -> Vec<OpLatencyTracker> {
    OpKind::all().iter().map(|_| OpLatencyTracker::new()).collect()
}

/// Applies one operation to the store. Results go through `black_box` so the
/// calls are not optimized away.
#[inline]
pub fn apply(store: &Store, op: &Operation) {
    match op {
        Operation::Set {
            key,
            value,
            ttl_secs,
        } => store.set(key, value, *ttl_secs),
        Operation::Get { key } => {
            black_box(store.get(key));
        }
        Operation::Del { key } => {
            black_box(store.del(key));
        }
        Operation::DbSize => {
            black_box(store.db_size());
        }
        Operation::Incr { key } => {
            black_box(store.incr(key));
        }
        Operation::ZAdd {
            collection,
            score,
            member,
        } => store.zadd(collection, *score, member),
        Operation::ZCard { collection } => {
            black_box(store.zcard(collection));
        }
        Operation::ZRank { collection, member } => {
            black_box(store.zrank(collection, member));
        }
        Operation::ZRange {
            collection,
            start,
            end,
        } => {
            black_box(store.zrange(collection, *start, *end));
        }
    }
}

/// Joins a worker, re-raising its panic on the calling thread
fn join_worker<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| panic::resume_unwind(payload))
}

/// Runs a concurrent load against a fresh store
pub struct LoadRunner {
    config: LoadConfig,
}

impl LoadRunner {
    pub fn new(config: LoadConfig) -> Self {
        Self { config }
    }

    fn store_config(&self) -> StoreConfig {
        let config = StoreConfig::new().with_max_memory(self.config.max_memory);
        match self.config.segments {
            Some(segments) => config.with_segments(segments.max(1)),
            None => config,
        }
    }

    /// Run the load and collect per-operation latencies and final store metrics
    pub fn run(&self) -> LoadResult {
        let store = Store::init(self.store_config());
        let threads = self.config.threads.max(1);
        info!(
            threads,
            ops_per_thread = self.config.ops_per_thread,
            max_memory = self.config.max_memory,
            "starting load run"
        );

        let started = Instant::now();
        let per_worker: Vec<Vec<OpLatencyTracker>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|worker| {
                    let store = &store;
                    let workload = self.config.workload.clone();
                    let seed = self.config.seed.wrapping_add(worker as u64);
                    let ops = self.config.ops_per_thread;
                    scope.spawn(move || {
                        let mut generator = WorkloadGenerator::new(workload, seed);
                        let mut trackers = new_trackers();
                        for _ in 0..ops {
                            let op = generator.next_op();
                            let start = Instant::now();
                            apply(store, &op);
                            let elapsed = start.elapsed().as_nanos();
                            trackers[op.kind().index()]
                                .record(u64::try_from(elapsed).unwrap_or(u64::MAX));
                        }
                        debug!(worker, "worker finished");
                        trackers
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(join_worker)
                .collect()
        });
        let duration = started.elapsed();

        let mut merged = new_trackers();
        for trackers in per_worker {
            for (total, tracker) in merged.iter_mut().zip(trackers) {
                total.merge(tracker);
            }
        }

        let per_op: BTreeMap<OpKind, OpLatencyStats> = OpKind::all()
            .into_iter()
            .zip(merged)
            .map(|(kind, tracker)| (kind, tracker.finalize()))
            .collect();
        let total_ops = per_op.values().map(|s| s.count).sum();

        info!(total_ops, ?duration, "load run complete");

        LoadResult {
            per_op,
            duration,
            total_ops,
            threads,
            store_metrics: store.metrics(),
        }
    }
}
