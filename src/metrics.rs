//! Store Metrics
//!
//! Operation counters for a [`Store`](crate::Store), reported through the
//! [`StoreMetrics`] trait as a `BTreeMap<String, f64>`.
//!
//! BTreeMap keeps the keys in a fixed order so that printed reports and CSV
//! exports line up from one run to the next.
//!
//! Counters are plain atomics updated with relaxed ordering. A report taken
//! while writers are active is a set of individually accurate counters, not a
//! consistent cut across all of them.

use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::BTreeMap;

/// Live counters owned by a store.
#[derive(Debug, Default)]
pub struct StoreStats {
    requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    writes: AtomicU64,
    scalar_evictions: AtomicU64,
    collection_evictions: AtomicU64,
    eviction_passes: AtomicU64,
    eviction_shortfalls: AtomicU64,
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl StoreStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// A `get` found a live value.
    pub fn record_hit(&self) {
        bump(&self.requests);
        bump(&self.hits);
    }

    /// A `get` found nothing.
    pub fn record_miss(&self) {
        bump(&self.requests);
        bump(&self.misses);
    }

    /// A `get` found an expired value and removed it. Counted as a miss too.
    pub fn record_expired(&self) {
        self.record_miss();
        bump(&self.expired);
    }

    /// A `set`, `incr` or `zadd` was applied.
    pub fn record_write(&self) {
        bump(&self.writes);
    }

    /// A scalar key was evicted.
    pub fn record_scalar_eviction(&self) {
        bump(&self.scalar_evictions);
    }

    /// A sorted-collection member was evicted.
    pub fn record_collection_eviction(&self) {
        bump(&self.collection_evictions);
    }

    /// An admission check found the write over budget and ran the eviction loop.
    pub fn record_eviction_pass(&self) {
        bump(&self.eviction_passes);
    }

    /// An eviction loop ran out of candidates while still over budget.
    pub fn record_shortfall(&self) {
        bump(&self.eviction_shortfalls);
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            requests: load(&self.requests),
            hits: load(&self.hits),
            misses: load(&self.misses),
            expired: load(&self.expired),
            writes: load(&self.writes),
            scalar_evictions: load(&self.scalar_evictions),
            collection_evictions: load(&self.collection_evictions),
            eviction_passes: load(&self.eviction_passes),
            eviction_shortfalls: load(&self.eviction_shortfalls),
        }
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        for counter in [
            &self.requests,
            &self.hits,
            &self.misses,
            &self.expired,
            &self.writes,
            &self.scalar_evictions,
            &self.collection_evictions,
            &self.eviction_passes,
            &self.eviction_shortfalls,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time copy of [`StoreStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// `get` calls.
    pub requests: u64,
    /// `get` calls that returned a value.
    pub hits: u64,
    /// `get` calls that returned nothing, including expired entries.
    pub misses: u64,
    /// Entries removed by lazy expiry.
    pub expired: u64,
    /// Applied `set`, `incr` and `zadd` calls.
    pub writes: u64,
    /// Scalar keys removed by eviction.
    pub scalar_evictions: u64,
    /// Sorted-collection members removed by eviction.
    pub collection_evictions: u64,
    /// Writes that triggered the eviction loop.
    pub eviction_passes: u64,
    /// Eviction loops that ended with the store still over budget.
    pub eviction_shortfalls: u64,
}

impl StatsSnapshot {
    /// Fraction of `get` calls that hit, or 0.0 before the first request.
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            self.hits as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Counter values keyed by name.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("requests".to_string(), self.requests as f64);
        metrics.insert("hits".to_string(), self.hits as f64);
        metrics.insert("misses".to_string(), self.misses as f64);
        metrics.insert("expired".to_string(), self.expired as f64);
        metrics.insert("writes".to_string(), self.writes as f64);
        metrics.insert("hit_rate".to_string(), self.hit_rate());

        metrics.insert(
            "scalar_evictions".to_string(),
            self.scalar_evictions as f64,
        );
        metrics.insert(
            "collection_evictions".to_string(),
            self.collection_evictions as f64,
        );
        metrics.insert("eviction_passes".to_string(), self.eviction_passes as f64);
        metrics.insert(
            "eviction_shortfalls".to_string(),
            self.eviction_shortfalls as f64,
        );

        metrics
    }
}

/// Uniform metrics reporting for a store.
pub trait StoreMetrics {
    /// Returns all metrics as key-value pairs in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Name of the scalar eviction policy (e.g. "LRU").
    fn policy_name(&self) -> &'static str;

    /// Name of the sorted-collection eviction policy.
    fn collection_policy_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_miss_expired_accounting() {
        let stats = StoreStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_expired();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.requests, 4);
        assert_eq!(snapshot.hits, 2);
        assert_eq!(snapshot.misses, 2);
        assert_eq!(snapshot.expired, 1);
        assert!((snapshot.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_rate_without_requests() {
        assert_eq!(StatsSnapshot::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_eviction_counters() {
        let stats = StoreStats::new();
        stats.record_eviction_pass();
        stats.record_scalar_eviction();
        stats.record_collection_eviction();
        stats.record_collection_eviction();
        stats.record_shortfall();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.scalar_evictions, 1);
        assert_eq!(snapshot.collection_evictions, 2);
        assert_eq!(snapshot.eviction_passes, 1);
        assert_eq!(snapshot.eviction_shortfalls, 1);
    }

    #[test]
    fn test_to_btreemap_keys() {
        let stats = StoreStats::new();
        stats.record_write();
        let metrics = stats.snapshot().to_btreemap();

        assert_eq!(metrics.get("writes"), Some(&1.0));
        let keys: Vec<_> = metrics.keys().cloned().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 10);
    }

    #[test]
    fn test_reset() {
        let stats = StoreStats::new();
        stats.record_hit();
        stats.record_write();
        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
