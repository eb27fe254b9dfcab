#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Component Map
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                              Store                                  │
//! │                                                                     │
//! │   set / get / del / incr          zadd / zcard / zrank / zrange     │
//! │           │                                   │                     │
//! │           ▼                                   ▼                     │
//! │   SegmentedMap<Entry>        SegmentedMap<Arc<SortedCollection>>    │
//! │                                                                     │
//! │   admission ──▶ MemoryAccountant ──over budget──▶ eviction loop     │
//! │                                                    │        │       │
//! │                               ScalarEvictionPolicy ┘        │       │
//! │                                 CollectionEvictionPolicy ───┘       │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Custom Policies
//!
//! The eviction strategies are type parameters of [`Store`], fixed at
//! construction:
//!
//! ```rust
//! use memdb::{LruPolicy, RandomLowestScore, Store, StoreConfig};
//!
//! // reproducible collection victims
//! let store = Store::with_policies(
//!     StoreConfig::new().with_max_memory(4096),
//!     LruPolicy::new(),
//!     RandomLowestScore::with_seed(7),
//! );
//! store.zadd("z", 1.0, "m");
//! assert_eq!(store.zcard("z"), 1);
//! ```
//!
//! ## Metrics
//!
//! ```rust
//! use memdb::{Store, StoreMetrics};
//!
//! let store = Store::new();
//! store.set("a", "1", 0);
//! store.get("a");
//!
//! let metrics = store.metrics();
//! assert_eq!(metrics["hits"], 1.0);
//! assert_eq!(metrics["db_size"], 1.0);
//! assert_eq!(store.policy_name(), "LRU");
//! ```
//!
//! ## Modules
//!
//! - [`store`]: the store and its nine operations
//! - [`entry`]: scalar value cell with optional expiry
//! - [`sorted`]: score-ordered collection type
//! - [`memory`]: byte cost model and running total
//! - [`eviction`]: eviction policy traits and default implementations
//! - [`config`]: store configuration
//! - [`metrics`]: operation counters and reporting

#[cfg(test)]
extern crate scoped_threadpool;

/// Store configuration.
pub mod config;

/// Scalar entry type with lazy expiry.
pub mod entry;

/// Score-ordered collections.
pub mod sorted;

/// Approximate memory accounting.
///
/// Byte cost model for entries and collection members, and the atomic running
/// total checked before each growing write.
pub mod memory;

/// Eviction policies.
pub mod eviction;

/// Operation counters and the [`StoreMetrics`] reporting trait.
pub mod metrics;

/// Lock-striped string map backing both top-level maps.
pub(crate) mod segment;

/// The store.
pub mod store;

pub use config::StoreConfig;
pub use entry::Entry;
pub use eviction::{
    CollectionEvictionPolicy, EvictedMember, LruPolicy, RandomLowestScore, ScalarEvictionPolicy,
};
pub use metrics::{StatsSnapshot, StoreMetrics, StoreStats};
pub use sorted::SortedCollection;
pub use store::Store;
