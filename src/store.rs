//! The Store
//!
//! [`Store`] owns the two top-level maps and runs admission control before
//! every growing write.
//!
//! # Layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │ Store<P, C>                                                          │
//! │                                                                      │
//! │  entries      SegmentedMap<Entry>                   scalar keys      │
//! │  collections  SegmentedMap<Arc<SortedCollection>>   sorted sets      │
//! │                                                                      │
//! │  db_size      AtomicU64            live scalar keys                  │
//! │  memory       MemoryAccountant     approximate bytes vs. budget      │
//! │  stats        StoreStats           operation counters                │
//! │                                                                      │
//! │  scalar_policy      P: ScalarEvictionPolicy      (default LRU)       │
//! │  collection_policy  C: CollectionEvictionPolicy  (default random)    │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Write Path
//!
//! 1. Compute the projected memory delta from what is currently stored.
//! 2. If `used + delta` exceeds the budget, evict until it does not or until
//!    both policies run out of candidates.
//! 3. Apply the write under the owning segment lock. `db_size` changes in the
//!    same critical section, so it always equals the number of stored keys.
//! 4. Commit the exact memory change and record the access.
//!
//! Step 3 runs whether or not step 2 made room. The budget is a target, not a
//! hard ceiling.
//!
//! # Lock Ordering
//!
//! A caller holds at most one of these at a time:
//!
//! - one scalar segment
//! - one collection segment
//! - one collection's member lock
//! - the scalar policy's index
//!
//! Reads of a collection clone its `Arc` out of the segment and release the
//! segment before taking the member lock.
//!
//! # Latency
//!
//! Eviction runs on the calling thread. A write that lands on a full store pays
//! for every eviction it triggers, and there is no throttling of callers while
//! the store is under sustained pressure.

use crate::config::StoreConfig;
use crate::entry::Entry;
use crate::eviction::{
    CollectionEvictionPolicy, LruPolicy, RandomLowestScore, ScalarEvictionPolicy,
};
use crate::memory::{self, MemoryAccountant};
use crate::metrics::{StatsSnapshot, StoreMetrics, StoreStats};
use crate::segment::SegmentedMap;
use crate::sorted::SortedCollection;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

enum Lookup {
    Hit(String),
    Expired(usize),
    Missing,
}

/// A concurrent, memory-bounded store of scalar keys and sorted collections.
///
/// All operations take `&self`; share a store between threads with `Arc`.
///
/// # Examples
///
/// ```
/// use memdb::Store;
/// use memdb::config::StoreConfig;
///
/// let store = Store::init(StoreConfig::new().with_max_memory(1024));
///
/// store.set("greeting", "hello", 0);
/// assert_eq!(store.get("greeting").as_deref(), Some("hello"));
/// assert_eq!(store.incr("visits"), 1);
/// assert_eq!(store.db_size(), 2);
///
/// store.zadd("board", 20.0, "bob");
/// store.zadd("board", 10.0, "alice");
/// assert_eq!(store.zrank("board", "alice"), Some(0));
/// assert_eq!(store.zrange("board", 0, -1), Vec::<String>::new());
/// assert_eq!(store.zrange("board", 0, 1), vec!["alice", "bob"]);
/// ```
pub struct Store<P = LruPolicy, C = RandomLowestScore> {
    entries: SegmentedMap<Entry>,
    collections: SegmentedMap<Arc<SortedCollection>>,
    db_size: AtomicU64,
    memory: MemoryAccountant,
    stats: StoreStats,
    scalar_policy: P,
    collection_policy: C,
}

impl Store {
    /// Creates a store with the default configuration and policies.
    pub fn new() -> Self {
        Self::init(StoreConfig::default())
    }

    /// Creates a store from `config` with the default policies.
    pub fn init(config: StoreConfig) -> Self {
        Self::with_policies(config, LruPolicy::new(), RandomLowestScore::new())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, C> Store<P, C>
where
    P: ScalarEvictionPolicy,
    C: CollectionEvictionPolicy,
{
    /// Creates a store from `config` with caller-supplied eviction policies.
    pub fn with_policies(config: StoreConfig, scalar_policy: P, collection_policy: C) -> Self {
        Self {
            entries: SegmentedMap::new(config.segments()),
            collections: SegmentedMap::new(config.segments()),
            db_size: AtomicU64::new(0),
            memory: MemoryAccountant::new(config.max_memory()),
            stats: StoreStats::new(),
            scalar_policy,
            collection_policy,
        }
    }

    // ========================================================================
    // Scalar keys
    // ========================================================================

    /// Inserts or replaces `key`. A `ttl_secs` of 0 means no expiry.
    pub fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        self.write_entry(key, Entry::from_ttl_secs(value.to_owned(), ttl_secs));
    }

    /// Inserts or replaces `key`, expiring `ttl` from now when given.
    pub fn set_with_ttl(&self, key: &str, value: &str, ttl: Option<Duration>) {
        self.write_entry(key, Entry::new(value.to_owned(), ttl));
    }

    /// Returns the value of `key`, or `None` if it is missing or expired.
    ///
    /// An expired entry found here is removed.
    pub fn get(&self, key: &str) -> Option<String> {
        let lookup = self.entries.with_segment(key, |segment| match segment.get(key) {
            Some(entry) if !entry.is_expired() => Lookup::Hit(entry.value().to_owned()),
            Some(_) => match segment.remove(key) {
                Some(entry) => {
                    self.db_size.fetch_sub(1, Ordering::Relaxed);
                    Lookup::Expired(entry.len())
                }
                None => Lookup::Missing,
            },
            None => Lookup::Missing,
        });

        match lookup {
            Lookup::Hit(value) => {
                self.scalar_policy.record_access(key);
                self.stats.record_hit();
                Some(value)
            }
            Lookup::Expired(len) => {
                self.reclaim_expired(key, len);
                None
            }
            Lookup::Missing => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Removes `key`. Returns `true` if a live entry was removed.
    ///
    /// An expired entry is removed as well but reported as absent.
    pub fn del(&self, key: &str) -> bool {
        let Some(entry) = self.take_entry(key) else {
            return false;
        };
        self.memory
            .release(memory::scalar_cost(key, entry.len()));
        self.scalar_policy.forget(key);
        !entry.is_expired()
    }

    /// Number of scalar keys currently stored.
    ///
    /// Expired entries count until something touches them.
    pub fn db_size(&self) -> u64 {
        self.db_size.load(Ordering::Relaxed)
    }

    /// Adds 1 to the integer stored at `key` and returns the result.
    ///
    /// A missing, expired or non-integer value counts as 0, so the result is 1.
    /// Incrementing `i64::MAX` also restarts at 1. The new value never expires.
    /// The read and the write happen under one segment lock, so concurrent
    /// callers never lose an increment.
    pub fn incr(&self, key: &str) -> i64 {
        let old_len = self.entries.get_with(key, Entry::len);
        let new_len = old_len.map_or(1, |len| len + 1);
        self.admit(memory::scalar_write_delta(key, old_len, Some(new_len)));

        let (next, previous) = self.entries.with_segment(key, |segment| {
            let current = segment
                .get(key)
                .filter(|entry| !entry.is_expired())
                .and_then(|entry| entry.value().parse::<i64>().ok())
                .unwrap_or(0);
            let next = current.checked_add(1).unwrap_or(1);

            let previous = segment.insert(key.to_owned(), Entry::new(next.to_string(), None));
            if previous.is_none() {
                self.db_size.fetch_add(1, Ordering::Relaxed);
            }
            (next, previous.map(|entry| entry.len()))
        });

        let written = next.to_string().len();
        self.memory
            .apply(Self::committed_scalar_delta(key, previous, written));
        self.scalar_policy.record_access(key);
        self.stats.record_write();
        next
    }

    // ========================================================================
    // Sorted collections
    // ========================================================================

    /// Stores `member` at `score` in `collection`, creating the collection if
    /// needed. A member already stored at `score` is replaced.
    pub fn zadd(&self, collection: &str, score: f64, member: &str) {
        let old_len = self
            .collection(collection)
            .and_then(|set| set.member_len_at(score));
        self.admit(memory::collection_write_delta(
            collection,
            old_len,
            member.len(),
        ));

        let set = self.collections.with_segment(collection, |segment| {
            match segment.get(collection) {
                Some(set) => Arc::clone(set),
                None => {
                    let set = Arc::new(SortedCollection::new());
                    segment.insert(collection.to_owned(), Arc::clone(&set));
                    set
                }
            }
        });

        let committed = match set.insert(score, member.to_owned()) {
            Some(displaced) => memory::replace_delta(displaced.len(), member.len()),
            None => memory::member_cost(collection, member.len()),
        };
        self.memory.apply(committed);
        self.stats.record_write();
    }

    /// Number of distinct scores in `collection`, 0 if it does not exist.
    pub fn zcard(&self, collection: &str) -> usize {
        self.collection(collection).map_or(0, |set| set.len())
    }

    /// 0-based ascending-score position of the first occurrence of `member`.
    pub fn zrank(&self, collection: &str, member: &str) -> Option<usize> {
        self.collection(collection)?.rank(member)
    }

    /// Members at positions `start..=end` in ascending-score order.
    ///
    /// Empty when the collection is missing, `start` is negative or past the
    /// end, or `end < start`. `end` is clamped to the last position.
    pub fn zrange(&self, collection: &str, start: i64, end: i64) -> Vec<String> {
        self.collection(collection)
            .map_or_else(Vec::new, |set| set.range(start, end))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Approximate bytes charged, saturated at 0.
    pub fn memory_used(&self) -> u64 {
        self.memory.used()
    }

    /// The configured byte budget.
    pub fn max_memory(&self) -> u64 {
        self.memory.max()
    }

    /// Number of sorted collections ever created. Collections are never dropped.
    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    /// Number of lock stripes per top-level map.
    pub fn segment_count(&self) -> usize {
        self.entries.segment_count()
    }

    /// Copies the operation counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Removes everything and zeroes the counters.
    ///
    /// Not atomic with respect to concurrent writers: a write racing with
    /// `clear` may survive it with its memory charge dropped.
    pub fn clear(&self) {
        self.entries.clear();
        self.collections.clear();
        self.scalar_policy.clear();
        self.db_size.store(0, Ordering::Relaxed);
        self.memory.reset();
        self.stats.reset();
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn collection(&self, name: &str) -> Option<Arc<SortedCollection>> {
        self.collections.get_with(name, Arc::clone)
    }

    fn is_live(&self, key: &str) -> bool {
        self.entries
            .get_with(key, |entry| !entry.is_expired())
            .unwrap_or(false)
    }

    fn write_entry(&self, key: &str, entry: Entry) {
        let written = entry.len();
        let old_len = self.entries.get_with(key, Entry::len);
        self.admit(memory::scalar_write_delta(key, old_len, Some(written)));

        let previous = self.put_entry(key, entry);
        self.memory
            .apply(Self::committed_scalar_delta(key, previous, written));
        self.scalar_policy.record_access(key);
        self.stats.record_write();
    }

    /// Inserts under the segment lock, counting the key if it is new.
    fn put_entry(&self, key: &str, entry: Entry) -> Option<usize> {
        self.entries.with_segment(key, |segment| {
            let previous = segment.insert(key.to_owned(), entry);
            if previous.is_none() {
                self.db_size.fetch_add(1, Ordering::Relaxed);
            }
            previous.map(|entry| entry.len())
        })
    }

    /// Removes under the segment lock, uncounting the key if it was present.
    fn take_entry(&self, key: &str) -> Option<Entry> {
        self.entries.with_segment(key, |segment| {
            let removed = segment.remove(key);
            if removed.is_some() {
                self.db_size.fetch_sub(1, Ordering::Relaxed);
            }
            removed
        })
    }

    fn committed_scalar_delta(key: &str, previous: Option<usize>, written: usize) -> i64 {
        match previous {
            Some(old) => memory::replace_delta(old, written),
            None => memory::scalar_cost(key, written),
        }
    }

    fn reclaim_expired(&self, key: &str, len: usize) {
        self.memory.release(memory::scalar_cost(key, len));
        self.scalar_policy.forget(key);
        self.stats.record_expired();
        trace!(key = %key, "removed expired entry");
    }

    /// Evicts until a write of `delta` bytes fits, or nothing is left to evict.
    fn admit(&self, delta: i64) {
        if delta <= 0 || !self.memory.would_exceed(delta) {
            return;
        }
        self.stats.record_eviction_pass();
        debug!(
            delta,
            used = self.memory.used(),
            max = self.memory.max(),
            "write over memory budget, evicting"
        );

        while self.memory.would_exceed(delta) {
            if self.evict_scalar() || self.evict_collection_member() {
                continue;
            }
            self.stats.record_shortfall();
            warn!(
                delta,
                used = self.memory.used(),
                max = self.memory.max(),
                "no eviction candidates left, proceeding over budget"
            );
            break;
        }
    }

    /// Returns `true` if the scalar policy produced a victim.
    fn evict_scalar(&self) -> bool {
        let Some(key) = self.scalar_policy.select_victim(&|key| self.is_live(key)) else {
            return false;
        };

        self.scalar_policy.forget(&key);
        if let Some(entry) = self.take_entry(&key) {
            let bytes = memory::scalar_cost(&key, entry.len());
            self.memory.release(bytes);
            self.stats.record_scalar_eviction();
            debug!(key = %key, bytes, "evicted scalar key");
        }
        true
    }

    /// Returns `true` if the collection policy removed a member.
    fn evict_collection_member(&self) -> bool {
        let candidates = self.collections.snapshot();
        let Some(evicted) = self.collection_policy.evict_one(&candidates) else {
            return false;
        };

        let bytes = memory::member_cost(&evicted.collection, evicted.member.len());
        self.memory.release(bytes);
        self.stats.record_collection_eviction();
        debug!(
            collection = %evicted.collection,
            score = evicted.score,
            bytes,
            "evicted sorted collection member"
        );
        true
    }
}

impl<P, C> StoreMetrics for Store<P, C>
where
    P: ScalarEvictionPolicy,
    C: CollectionEvictionPolicy,
{
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.stats.snapshot().to_btreemap();

        metrics.insert("db_size".to_string(), self.db_size() as f64);
        metrics.insert("collections".to_string(), self.collection_count() as f64);
        metrics.insert("memory_used".to_string(), self.memory.used() as f64);
        metrics.insert("max_memory".to_string(), self.memory.max() as f64);
        metrics.insert(
            "memory_utilization".to_string(),
            self.memory.utilization(),
        );
        metrics.insert(
            "tracked_keys".to_string(),
            self.scalar_policy.tracked() as f64,
        );

        metrics
    }

    fn policy_name(&self) -> &'static str {
        self.scalar_policy.name()
    }

    fn collection_policy_name(&self) -> &'static str {
        self.collection_policy.name()
    }
}

impl<P, C> fmt::Debug for Store<P, C>
where
    P: ScalarEvictionPolicy,
    C: CollectionEvictionPolicy,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("db_size", &self.db_size())
            .field("collections", &self.collection_count())
            .field("memory_used", &self.memory.used())
            .field("max_memory", &self.memory.max())
            .field("segments", &self.entries.segment_count())
            .field("scalar_policy", &self.scalar_policy.name())
            .field("collection_policy", &self.collection_policy.name())
            .finish()
    }
}
