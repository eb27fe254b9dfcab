//! Scalar Entry Type
//!
//! An [`Entry`] is one value cell of the scalar key space: the stored string and
//! an optional absolute expiry instant. Entries are owned by the store's scalar
//! map and are replaced wholesale on every write; nothing mutates an entry in
//! place.
//!
//! # Expiry Model
//!
//! Expiry is *lazy*. An entry whose deadline has passed is still physically
//! present (and still charged against the memory budget) until some operation
//! touches its key:
//!
//! - `get` discovers the expiry, removes the entry and reports absence
//! - `set` / `incr` overwrite it as though it were absent
//! - eviction skips it when ranking victims
//!
//! There is no background sweeper.
//!
//! # Examples
//!
//! ```
//! use memdb::entry::Entry;
//! use std::time::Duration;
//!
//! let plain = Entry::new("v".to_string(), None);
//! assert!(!plain.is_expired());
//! assert!(plain.expires_at().is_none());
//!
//! let volatile = Entry::new("v".to_string(), Some(Duration::from_secs(60)));
//! assert!(volatile.expires_at().is_some());
//! assert!(!volatile.is_expired());
//! ```

use core::fmt;
use std::time::{Duration, Instant};

/// A scalar value with optional absolute expiry.
#[derive(Clone)]
pub struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    /// Creates an entry that expires `ttl` from now, or never when `ttl` is `None`.
    #[inline]
    pub fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    /// Creates an entry from a TTL expressed in whole seconds; 0 means no expiry.
    #[inline]
    pub fn from_ttl_secs(value: String, ttl_secs: u64) -> Self {
        let ttl = (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs));
        Self::new(value, ttl)
    }

    /// Returns the stored value.
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the absolute expiry instant, if any.
    #[inline]
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Checks whether the entry's deadline has passed.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Checks expiry against a caller-supplied clock reading.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }

    /// Length of the stored value in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Returns `true` if the stored value is the empty string.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("value", &self.value)
            .field("expires_at", &self.expires_at)
            .field("expired", &self.is_expired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = Entry::new("value".to_string(), None);
        assert_eq!(entry.value(), "value");
        assert!(entry.expires_at().is_none());
        assert!(!entry.is_expired_at(Instant::now() + Duration::from_secs(3600)));
    }

    #[test]
    fn test_entry_expires_at_deadline() {
        let entry = Entry::new("value".to_string(), Some(Duration::ZERO));
        let deadline = entry.expires_at().unwrap();
        assert!(entry.is_expired_at(deadline));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_entry_not_expired_before_deadline() {
        let entry = Entry::new("value".to_string(), Some(Duration::from_secs(60)));
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_zero_ttl_secs_means_no_expiry() {
        let entry = Entry::from_ttl_secs("value".to_string(), 0);
        assert!(entry.expires_at().is_none());

        let entry = Entry::from_ttl_secs("value".to_string(), 5);
        assert!(entry.expires_at().is_some());
    }

    #[test]
    fn test_len_and_is_empty() {
        let entry = Entry::new("hello".to_string(), None);
        assert_eq!(entry.len(), 5);
        assert!(!entry.is_empty());
        assert!(Entry::new(String::new(), None).is_empty());
    }
}
