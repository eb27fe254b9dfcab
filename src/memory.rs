//! Approximate Memory Accounting
//!
//! The store charges every entry a nominal byte cost and keeps a running total
//! in one process-wide atomic. The total is adjusted by deltas only; it is never
//! recomputed by scanning the maps.
//!
//! # Cost Model
//!
//! | Shape | Charged bytes |
//! |-------|---------------|
//! | scalar entry | `len(key) + len(value)` |
//! | sorted-collection member | `len(collection) + len(member) + 8` |
//!
//! The 8 is [`SCORE_BYTES`], the width of an `f64` score.
//!
//! # Projected vs. Committed Deltas
//!
//! Admission control runs *before* a write and works from a **projected** delta:
//!
//! ```text
//! projected = len(new) - len(old) + len(key)          (+ 8 for sorted members)
//! ```
//!
//! with `len(old) = 0` when nothing is stored yet. The key term is charged even
//! on overwrite, which makes the projection an upper bound of what the write
//! can add.
//!
//! Once the write is applied under its lock, the store commits the **exact**
//! change for what actually happened (creation, replacement or removal), which
//! keeps the running total equal to the cost model above. Racing writers can
//! still make the two disagree briefly (an eviction can remove the very entry a
//! projection was computed against) so the total is approximate under
//! contention, and it is reported saturated at 0.

use core::fmt;
use core::sync::atomic::{AtomicI64, Ordering};

/// Bytes charged for the score of each sorted-collection member.
pub const SCORE_BYTES: i64 = 8;

#[inline]
fn len_i64(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

/// Projected delta for writing a scalar value.
///
/// `old_len` is the length of the value currently stored (`None` if absent),
/// `new_len` the length being written (`None` for a deletion).
#[inline]
pub fn scalar_write_delta(key: &str, old_len: Option<usize>, new_len: Option<usize>) -> i64 {
    len_i64(new_len.unwrap_or(0)) - len_i64(old_len.unwrap_or(0)) + len_i64(key.len())
}

/// Projected delta for writing a sorted-collection member at one score.
///
/// `old_len` is the length of the member already stored at that score.
#[inline]
pub fn collection_write_delta(collection: &str, old_len: Option<usize>, new_len: usize) -> i64 {
    scalar_write_delta(collection, old_len, Some(new_len)) + SCORE_BYTES
}

/// Cost of one scalar entry under the accounting model.
#[inline]
pub fn scalar_cost(key: &str, value_len: usize) -> i64 {
    len_i64(key.len()) + len_i64(value_len)
}

/// Cost of one sorted-collection member under the accounting model.
#[inline]
pub fn member_cost(collection: &str, member_len: usize) -> i64 {
    len_i64(collection.len()) + len_i64(member_len) + SCORE_BYTES
}

/// Committed delta for replacing a value of `old_len` bytes with `new_len` bytes.
#[inline]
pub fn replace_delta(old_len: usize, new_len: usize) -> i64 {
    len_i64(new_len) - len_i64(old_len)
}

/// Running byte total checked against a fixed budget.
pub struct MemoryAccountant {
    used: AtomicI64,
    max: u64,
}

impl MemoryAccountant {
    /// Creates an accountant with nothing charged.
    pub fn new(max: u64) -> Self {
        Self {
            used: AtomicI64::new(0),
            max,
        }
    }

    /// The fixed byte budget.
    #[inline]
    pub fn max(&self) -> u64 {
        self.max
    }

    /// Current total, saturated at 0.
    #[inline]
    pub fn used(&self) -> u64 {
        u64::try_from(self.used.load(Ordering::Relaxed)).unwrap_or(0)
    }

    /// Adjusts the total by `delta` (negative to release).
    #[inline]
    pub fn apply(&self, delta: i64) {
        if delta != 0 {
            self.used.fetch_add(delta, Ordering::Relaxed);
        }
    }

    /// Releases `bytes`.
    #[inline]
    pub fn release(&self, bytes: i64) {
        self.apply(-bytes);
    }

    /// Whether adding `delta` to the current total would exceed the budget.
    #[inline]
    pub fn would_exceed(&self, delta: i64) -> bool {
        let projected = i128::from(self.used.load(Ordering::Relaxed)) + i128::from(delta);
        projected > i128::from(self.max)
    }

    /// Current total divided by the budget (0.0 when the budget is 0).
    pub fn utilization(&self) -> f64 {
        if self.max > 0 {
            self.used() as f64 / self.max as f64
        } else {
            0.0
        }
    }

    /// Forgets everything charged so far.
    pub fn reset(&self) {
        self.used.store(0, Ordering::Relaxed);
    }
}

impl fmt::Debug for MemoryAccountant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAccountant")
            .field("used", &self.used.load(Ordering::Relaxed))
            .field("max", &self.max)
            .finish()
    }
}
