//! Store Configuration
//!
//! This module provides [`StoreConfig`], the single entry point for sizing a
//! [`Store`](crate::Store).
//!
//! # Sizing Guidelines
//!
//! ## Understanding `max_memory`
//!
//! `max_memory` is the byte budget checked before every growing mutation. It is
//! compared against an *approximate* total, not the real heap footprint:
//!
//! ```text
//! scalar entry         ≈ len(key) + len(value)
//! sorted-set member    ≈ len(collection) + len(member) + 8
//! ```
//!
//! Hash table buckets, lock words and `String` headers are not charged, so the
//! process will use noticeably more memory than `max_memory` under a full load.
//! The budget is advisory: a write that cannot evict enough still proceeds.
//!
//! ## Understanding `segments`
//!
//! Both top-level maps (scalar keys and sorted collections) are split into
//! `segments` independently locked stripes. More segments means less contention
//! between callers touching different keys, at the cost of one lock word and
//! one small hash table per segment.
//!
//! # Examples
//!
//! ```
//! use memdb::config::StoreConfig;
//!
//! // 16MB budget spread over 8 lock stripes
//! let config = StoreConfig::new()
//!     .with_max_memory(16 * 1024 * 1024)
//!     .with_segments(8);
//!
//! assert_eq!(config.max_memory(), 16 * 1024 * 1024);
//! assert_eq!(config.segments(), 8);
//! ```

use core::fmt;

/// Default byte budget: 100MB.
pub const DEFAULT_MAX_MEMORY: u64 = 100 * 1024 * 1024;

/// Returns the default number of segments based on available parallelism.
pub fn default_segment_count() -> usize {
    // Use available parallelism, clamped to reasonable bounds
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(16)
        .clamp(4, 64)
}

/// Configuration for a [`Store`](crate::Store).
///
/// # Optional Parameters (Builder Methods)
///
/// - `max_memory`: approximate byte budget (default: [`DEFAULT_MAX_MEMORY`])
/// - `segments`: number of lock stripes per top-level map (default: based on CPU count)
#[derive(Clone, Copy)]
pub struct StoreConfig {
    max_memory: u64,
    segments: usize,
}

impl StoreConfig {
    /// Creates a configuration with the default budget and segment count.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_memory: DEFAULT_MAX_MEMORY,
            segments: default_segment_count(),
        }
    }

    /// Sets the approximate byte budget.
    ///
    /// A budget of 0 makes every growing write run an eviction pass first.
    #[must_use]
    pub fn with_max_memory(mut self, max_memory: u64) -> Self {
        self.max_memory = max_memory;
        self
    }

    /// Sets the number of lock stripes used by each top-level map.
    ///
    /// # Panics
    ///
    /// Panics if `segments` is 0.
    #[must_use]
    pub fn with_segments(mut self, segments: usize) -> Self {
        assert!(segments > 0, "segments must be > 0");
        self.segments = segments;
        self
    }

    /// Returns the byte budget.
    #[inline]
    pub fn max_memory(&self) -> u64 {
        self.max_memory
    }

    /// Returns the number of segments.
    #[inline]
    pub fn segments(&self) -> usize {
        self.segments
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("max_memory", &self.max_memory)
            .field("segments", &self.segments)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.max_memory(), 100 * 1024 * 1024);
        assert!(config.segments() >= 4);
        assert!(config.segments() <= 64);
    }

    #[test]
    fn test_store_config_builder() {
        let config = StoreConfig::new()
            .with_max_memory(1024)
            .with_segments(3);
        assert_eq!(config.max_memory(), 1024);
        assert_eq!(config.segments(), 3);
    }

    #[test]
    #[should_panic(expected = "segments must be > 0")]
    fn test_zero_segments_rejected() {
        let _ = StoreConfig::new().with_segments(0);
    }
}
