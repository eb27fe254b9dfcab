//! Segmented (Lock-Striped) String Map
//!
//! The store's two top-level maps are instances of [`SegmentedMap`]. The key
//! space is partitioned across a fixed number of segments by hash, and each
//! segment is a plain hash map behind its own `parking_lot::Mutex`:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         SegmentedMap<V>                              │
//! │                                                                      │
//! │  hash(key) % N  ──▶  Segment Selection                               │
//! │                                                                      │
//! │  ┌──────────────┐ ┌──────────────┐     ┌──────────────┐              │
//! │  │  Segment 0   │ │  Segment 1   │ ... │  Segment N-1 │              │
//! │  │   [Mutex]    │ │   [Mutex]    │     │   [Mutex]    │              │
//! │  │  HashMap<>   │ │  HashMap<>   │     │  HashMap<>   │              │
//! │  └──────────────┘ └──────────────┘     └──────────────┘              │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation locks exactly one segment, except the whole-map views
//! (`len`, `snapshot`) which visit segments one at a time and so may observe a
//! slightly stale picture under concurrent writes.
//!
//! [`SegmentedMap::with_segment`] hands the caller the locked segment for the
//! duration of a closure. That is the building block for per-key atomic
//! read-modify-write (`incr`, lazy expiry on `get`): everything inside the
//! closure is serialized against every other access to keys in that segment.
//!
//! ## Why Mutex Instead of RwLock?
//!
//! Most store reads are writes in disguise (`get` may remove an expired entry,
//! `incr` replaces the value) and critical sections are a handful of hash
//! probes, so `parking_lot::Mutex` is used throughout.

use core::fmt;
use core::hash::BuildHasher;
use parking_lot::Mutex;

#[cfg(feature = "hashbrown")]
use hashbrown::DefaultHashBuilder;
#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;
#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// One locked stripe of a [`SegmentedMap`].
pub(crate) type Segment<V, S> = HashMap<String, V, S>;

/// A string-keyed map striped across independently locked segments.
pub(crate) struct SegmentedMap<V, S = DefaultHashBuilder> {
    segments: Box<[Mutex<Segment<V, S>>]>,
    hash_builder: S,
}

impl<V> SegmentedMap<V, DefaultHashBuilder> {
    /// Creates a map with `segment_count` stripes and the default hasher.
    pub(crate) fn new(segment_count: usize) -> Self {
        Self::with_hasher(segment_count, DefaultHashBuilder::default())
    }
}

impl<V, S> SegmentedMap<V, S>
where
    S: BuildHasher + Clone,
{
    /// Creates a map with `segment_count` stripes sharing one hash builder.
    pub(crate) fn with_hasher(segment_count: usize, hash_builder: S) -> Self {
        let segment_count = segment_count.max(1);
        let segments: Vec<_> = (0..segment_count)
            .map(|_| Mutex::new(HashMap::with_hasher(hash_builder.clone())))
            .collect();

        Self {
            segments: segments.into_boxed_slice(),
            hash_builder,
        }
    }

    /// Returns the segment index for the given key.
    #[inline]
    fn segment_index(&self, key: &str) -> usize {
        (self.hash_builder.hash_one(key) as usize) % self.segments.len()
    }

    /// Returns the number of segments.
    #[inline]
    pub(crate) fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Runs `f` with exclusive access to the segment that owns `key`.
    ///
    /// The lock is held for the whole closure, so anything `f` does to `key`
    /// is atomic with respect to every other operation on that key.
    #[inline]
    pub(crate) fn with_segment<R, F>(&self, key: &str, f: F) -> R
    where
        F: FnOnce(&mut Segment<V, S>) -> R,
    {
        let idx = self.segment_index(key);
        let mut segment = self.segments[idx].lock();
        f(&mut segment)
    }

    /// Applies `f` to the value stored under `key` while holding the lock.
    pub(crate) fn get_with<R, F>(&self, key: &str, f: F) -> Option<R>
    where
        F: FnOnce(&V) -> R,
    {
        self.with_segment(key, |segment| segment.get(key).map(f))
    }

    /// Returns the total number of entries across all segments.
    ///
    /// Note: This acquires a lock on each segment sequentially, so the
    /// returned value may be slightly stale in high-concurrency scenarios.
    pub(crate) fn len(&self) -> usize {
        self.segments.iter().map(|s| s.lock().len()).sum()
    }

    /// Removes every entry from every segment.
    pub(crate) fn clear(&self) {
        for segment in self.segments.iter() {
            segment.lock().clear();
        }
    }
}

impl<V, S> SegmentedMap<V, S>
where
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Returns a point-in-time copy of all `(key, value)` pairs.
    ///
    /// Segments are copied one after another, so the result is not an atomic
    /// snapshot of the whole map.
    pub(crate) fn snapshot(&self) -> Vec<(String, V)> {
        let mut out = Vec::new();
        for segment in self.segments.iter() {
            let segment = segment.lock();
            out.extend(segment.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        out
    }
}

impl<V, S> fmt::Debug for SegmentedMap<V, S>
where
    S: BuildHasher + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentedMap")
            .field("segment_count", &self.segments.len())
            .field("total_len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;

    fn insert<V>(map: &SegmentedMap<V>, key: &str, value: V) -> Option<V> {
        map.with_segment(key, |segment| segment.insert(key.to_string(), value))
    }

    #[test]
    fn test_basic_operations() {
        let map: SegmentedMap<i32> = SegmentedMap::new(16);
        assert_eq!(map.len(), 0);
        assert_eq!(map.segment_count(), 16);

        assert_eq!(insert(&map, "a", 1), None);
        assert_eq!(insert(&map, "b", 2), None);
        assert_eq!(insert(&map, "a", 3), Some(1));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get_with("a", |v| *v), Some(3));
        assert_eq!(map.get_with("missing", |v| *v), None);

        assert_eq!(map.with_segment("a", |segment| segment.remove("a")), Some(3));
        assert_eq!(map.len(), 1);

        map.clear();
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn test_zero_segments_clamped_to_one() {
        let map: SegmentedMap<i32> = SegmentedMap::new(0);
        assert_eq!(map.segment_count(), 1);
        insert(&map, "k", 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_snapshot_contains_all_entries() {
        let map: SegmentedMap<usize> = SegmentedMap::new(4);
        for i in 0..50 {
            insert(&map, &format!("key_{i}"), i);
        }

        let mut snapshot = map.snapshot();
        snapshot.sort_by_key(|(_, v)| *v);
        assert_eq!(snapshot.len(), 50);
        assert_eq!(snapshot[0], ("key_0".to_string(), 0));
        assert_eq!(snapshot[49], ("key_49".to_string(), 49));
    }

    #[test]
    fn test_with_segment_is_atomic_per_key() {
        let map: Arc<SegmentedMap<u64>> = Arc::new(SegmentedMap::new(8));
        let num_threads = 8;
        let ops_per_thread = 1000;

        let handles: Vec<_> = (0..num_threads)
            .map(|_| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    for _ in 0..ops_per_thread {
                        map.with_segment("counter", |segment| {
                            *segment.entry("counter".to_string()).or_insert(0) += 1;
                        });
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            map.get_with("counter", |v| *v),
            Some((num_threads * ops_per_thread) as u64)
        );
    }
}
