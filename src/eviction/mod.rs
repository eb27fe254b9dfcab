//! Eviction Policies
//!
//! When a write would push the store over its memory budget, the store runs an
//! eviction loop that alternates two independent policies:
//!
//! ```text
//! while used + delta > budget:
//!     ScalarEvictionPolicy::select_victim()  ──Some(key)──▶ delete key, continue
//!              │ None
//!              ▼
//!     CollectionEvictionPolicy::evict_one()  ──Some(..)──▶ release bytes, continue
//!              │ None
//!              ▼
//!            stop (store stays over budget until a later write)
//! ```
//!
//! Both policies are traits so the store can be built with alternative
//! strategies; the defaults are:
//!
//! | Trait | Default | Behavior |
//! |-------|---------|----------|
//! | [`ScalarEvictionPolicy`] | [`LruPolicy`] | least-recently-accessed live key |
//! | [`CollectionEvictionPolicy`] | [`RandomLowestScore`] | random non-empty collection, its lowest score |
//!
//! The policy is chosen at construction time through the store's type
//! parameters; there is no runtime switching.

mod lowest_score;
mod lru;

pub use self::lowest_score::RandomLowestScore;
pub use self::lru::LruPolicy;

use crate::sorted::SortedCollection;
use std::sync::Arc;

/// Chooses which scalar key to delete under memory pressure.
///
/// The store reports every access and every removal so the policy can keep
/// its own bookkeeping; the policy never touches the store's maps directly.
pub trait ScalarEvictionPolicy: Send + Sync {
    /// Short identifier used in metrics output.
    fn name(&self) -> &'static str;

    /// Records that `key` was just read or written.
    fn record_access(&self, key: &str);

    /// Drops any bookkeeping for `key` after it left the store.
    fn forget(&self, key: &str);

    /// Picks a victim.
    ///
    /// `is_live` reports whether a key is still present and unexpired. Keys for
    /// which it returns `false` are stale and should be discarded from the
    /// policy's bookkeeping.
    fn select_victim(&self, is_live: &dyn Fn(&str) -> bool) -> Option<String>;

    /// Number of keys currently tracked.
    fn tracked(&self) -> usize;

    /// Drops all bookkeeping.
    fn clear(&self);
}

/// A member removed from a sorted collection by eviction.
#[derive(Debug, Clone, PartialEq)]
pub struct EvictedMember {
    /// Name of the collection the member was removed from.
    pub collection: String,
    /// Score the member was stored at.
    pub score: f64,
    /// The removed member.
    pub member: String,
}

/// Removes one member from some sorted collection under memory pressure.
pub trait CollectionEvictionPolicy: Send + Sync {
    /// Short identifier used in metrics output.
    fn name(&self) -> &'static str;

    /// Removes a single member from one of `collections`.
    ///
    /// `collections` is the set of known collections, captured once for this
    /// attempt. Returns `None` if every collection turned out to be empty.
    fn evict_one(&self, collections: &[(String, Arc<SortedCollection>)]) -> Option<EvictedMember>;
}
