//! Sorted Collections
//!
//! A [`SortedCollection`] is the value type of the store's second top-level map:
//! an ascending `score → member` mapping for one named set.
//!
//! # Score Is the Key
//!
//! Unlike a conventional sorted set (where the *member* is unique and the score
//! is an attribute), here the **score** is the unique key. Adding a member at a
//! score that is already occupied replaces whatever member lived there:
//!
//! ```text
//! insert(1.0, "p1")   { 1.0: p1 }
//! insert(2.0, "p2")   { 1.0: p1, 2.0: p2 }
//! insert(1.0, "p3")   { 1.0: p3, 2.0: p2 }     p1 is gone, len stays 2
//! ```
//!
//! Conversely, the same member may appear at several scores. Rank lookups
//! report the first (lowest-score) occurrence.
//!
//! # Score Ordering
//!
//! Scores are compared with [`f64::total_cmp`], so `-0.0` sorts below `0.0`
//! and the two are separate keys. Every NaN is folded into one key that sorts
//! above `+inf`.
//!
//! # Concurrency
//!
//! Each collection carries its own `parking_lot::Mutex` around a `BTreeMap`
//! keyed by score. Operations on different collections never
//! contend; operations on the same collection are serialized, which keeps the
//! ordering consistent under concurrent inserts and evictions.
//!
//! # Examples
//!
//! ```
//! use memdb::sorted::SortedCollection;
//!
//! let set = SortedCollection::new();
//! set.insert(2.0, "b".to_string());
//! set.insert(1.0, "a".to_string());
//!
//! assert_eq!(set.rank("a"), Some(0));
//! assert_eq!(set.range(0, 1), vec!["a".to_string(), "b".to_string()]);
//! assert_eq!(set.pop_lowest(), Some((1.0, "a".to_string())));
//! assert_eq!(set.len(), 1);
//! ```

use core::cmp::Ordering;
use core::fmt;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Map key ordering scores by [`f64::total_cmp`] with NaN canonicalized.
#[derive(Clone, Copy)]
struct Score(f64);

impl Score {
    #[inline]
    fn new(score: f64) -> Self {
        if score.is_nan() {
            Self(f64::NAN)
        } else {
            Self(score)
        }
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Ascending `score → member` mapping for one named set.
#[derive(Default)]
pub struct SortedCollection {
    members: Mutex<BTreeMap<Score, String>>,
}

impl SortedCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `member` at `score`, returning the member it displaced (if any).
    pub fn insert(&self, score: f64, member: String) -> Option<String> {
        self.members.lock().insert(Score::new(score), member)
    }

    /// Length in bytes of the member currently stored at `score`.
    pub fn member_len_at(&self, score: f64) -> Option<usize> {
        self.members
            .lock()
            .get(&Score::new(score))
            .map(String::len)
    }

    /// Number of distinct scores stored.
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Returns `true` if the collection holds no members.
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// 0-based position of the first occurrence of `member` in ascending-score
    /// order. Linear in the collection size.
    pub fn rank(&self, member: &str) -> Option<usize> {
        self.members
            .lock()
            .values()
            .position(|candidate| candidate == member)
    }

    /// Members at positions `start..=end` in ascending-score order, clamped to
    /// what is available.
    ///
    /// Returns an empty vector when `start` is negative, when `end < start`, or
    /// when `start` is past the last position.
    pub fn range(&self, start: i64, end: i64) -> Vec<String> {
        if start < 0 || end < start {
            return Vec::new();
        }
        let skip = usize::try_from(start).unwrap_or(usize::MAX);
        let take = usize::try_from(end - start)
            .ok()
            .and_then(|n| n.checked_add(1))
            .unwrap_or(usize::MAX);

        self.members
            .lock()
            .values()
            .skip(skip)
            .take(take)
            .cloned()
            .collect()
    }

    /// Removes and returns the lowest-scoring `(score, member)` pair.
    pub fn pop_lowest(&self) -> Option<(f64, String)> {
        self.members
            .lock()
            .pop_first()
            .map(|(score, member)| (score.0, member))
    }
}

impl fmt::Debug for SortedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedCollection")
            .field("len", &self.len())
            .finish()
    }
}
