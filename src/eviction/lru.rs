//! Least Recently Used scalar eviction.
//!
//! # Algorithm
//!
//! The policy keeps an ordered index of access ticks:
//!
//! ```text
//! by_tick: BTreeMap<tick, key>     ascending = oldest first
//! by_key:  HashMap<key, tick>      reverse index for O(log n) refresh
//! ```
//!
//! Ticks come from a process-wide atomic counter rather than the wall clock,
//! so two accesses within the same millisecond still get distinct positions.
//!
//! - **record_access**: drop the key's previous tick (if any), insert a fresh one
//! - **forget**: drop the key's tick
//! - **select_victim**: look at the oldest tick; if its key is still live,
//!   return it, otherwise discard that record and look at the next one
//!
//! The index is best-effort. A key can be written and deleted concurrently in
//! an order that leaves it briefly untracked (it becomes evictable again on
//! its next access) or leaves a record behind for a key that is gone (pruned
//! the next time selection reaches it).
//!
//! # Locking
//!
//! The index sits behind its own `parking_lot::Mutex`, separate from the data
//! segments. Selection never holds the index lock while calling `is_live`, so
//! the store may take a segment lock inside `is_live` without risking a lock
//! order inversion.

use super::ScalarEvictionPolicy;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

#[derive(Default)]
struct AccessOrder {
    by_tick: BTreeMap<u64, String>,
    by_key: HashMap<String, u64>,
}

impl AccessOrder {
    fn touch(&mut self, key: &str, tick: u64) {
        match self.by_key.get_mut(key) {
            Some(previous) => {
                self.by_tick.remove(previous);
                *previous = tick;
            }
            None => {
                self.by_key.insert(key.to_owned(), tick);
            }
        }
        self.by_tick.insert(tick, key.to_owned());
    }

    fn remove_key(&mut self, key: &str) {
        if let Some(tick) = self.by_key.remove(key) {
            self.by_tick.remove(&tick);
        }
    }

    /// Removes the record at `tick` only if it still maps to `key`.
    fn remove_record(&mut self, tick: u64, key: &str) {
        if self.by_tick.get(&tick).is_some_and(|k| k == key) {
            self.by_tick.remove(&tick);
            if self.by_key.get(key) == Some(&tick) {
                self.by_key.remove(key);
            }
        }
    }

    fn oldest(&self) -> Option<(u64, String)> {
        self.by_tick
            .first_key_value()
            .map(|(tick, key)| (*tick, key.clone()))
    }
}

/// Evicts the live scalar key with the oldest access.
pub struct LruPolicy {
    clock: AtomicU64,
    order: Mutex<AccessOrder>,
}

impl LruPolicy {
    /// Creates an empty policy.
    pub fn new() -> Self {
        Self {
            clock: AtomicU64::new(0),
            order: Mutex::new(AccessOrder::default()),
        }
    }

    /// Keys in access order, oldest first. Includes stale records that have not
    /// been pruned yet.
    pub fn keys_by_age(&self) -> Vec<String> {
        self.order.lock().by_tick.values().cloned().collect()
    }
}

impl Default for LruPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalarEvictionPolicy for LruPolicy {
    fn name(&self) -> &'static str {
        "LRU"
    }

    fn record_access(&self, key: &str) {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed);
        self.order.lock().touch(key, tick);
    }

    fn forget(&self, key: &str) {
        self.order.lock().remove_key(key);
    }

    fn select_victim(&self, is_live: &dyn Fn(&str) -> bool) -> Option<String> {
        loop {
            let (tick, key) = self.order.lock().oldest()?;
            if is_live(&key) {
                return Some(key);
            }
            self.order.lock().remove_record(tick, &key);
        }
    }

    fn tracked(&self) -> usize {
        self.order.lock().by_tick.len()
    }

    fn clear(&self) {
        let mut order = self.order.lock();
        order.by_tick.clear();
        order.by_key.clear();
    }
}

impl fmt::Debug for LruPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruPolicy")
            .field("tracked", &self.tracked())
            .finish()
    }
}
