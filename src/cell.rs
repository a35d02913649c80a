//! The data cell: owner of one key/value pair and the mutex guarding its
//! value buffer.
//!
//! Cells are variable-length (their key length differs per entry) and are
//! therefore always heap-allocated directly; only the fixed-size chain
//! nodes that link cells into a bucket go through the slab [`SlabPool`].

use parking_lot::Mutex;

/// One key/value pair plus the lock protecting the value.
///
/// The key and fingerprint are set once at construction and never change.
/// Only the value buffer is mutable, and only under `value`'s mutex — this
/// is the "entry-level mutex" of the two-tier locking protocol, acquired
/// only while the owning bucket's lock is already held.
pub(crate) struct Cell {
    key: Box<[u8]>,
    fingerprint: u32,
    value: Mutex<Vec<u8>>,
}

impl Cell {
    /// Creates a new cell. The key must be non-empty; the value may be
    /// empty (a zero-length value is a valid, distinct state from "no
    /// entry").
    pub(crate) fn create(key: &[u8], fingerprint: u32, value: &[u8]) -> Cell {
        debug_assert!(!key.is_empty(), "empty keys are rejected before reaching Cell::create");
        Cell {
            key: Box::from(key),
            fingerprint,
            value: Mutex::new(value.to_vec()),
        }
    }

    pub(crate) fn key(&self) -> &[u8] {
        &self.key
    }

    pub(crate) fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    pub(crate) fn matches(&self, key: &[u8], fingerprint: u32) -> bool {
        // Fingerprint compared first so a mismatch short-circuits before the
        // (more expensive) byte-wise key comparison.
        self.fingerprint == fingerprint && *self.key == *key
    }

    /// Returns an owned copy of the current value. The caller owns the
    /// returned buffer outright; no reference into the cell escapes the
    /// mutex guard.
    pub(crate) fn read(&self) -> Vec<u8> {
        self.value.lock().clone()
    }

    /// Replaces the value in place when the new length matches the old one
    /// (skipping a reallocation), otherwise reallocates. Either way this
    /// completes or has no effect at all — there is no partially-written
    /// intermediate state observable from outside the mutex.
    pub(crate) fn update(&self, new_value: &[u8]) {
        let mut guard = self.value.lock();
        if guard.len() == new_value.len() {
            guard.copy_from_slice(new_value);
        } else {
            *guard = new_value.to_vec();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_what_was_written() {
        let cell = Cell::create(b"k", 1, b"hello");
        assert_eq!(cell.read(), b"hello");
    }

    #[test]
    fn update_same_length_is_in_place() {
        let cell = Cell::create(b"k", 1, b"abc");
        cell.update(b"xyz");
        assert_eq!(cell.read(), b"xyz");
    }

    #[test]
    fn update_changes_length() {
        let cell = Cell::create(b"k", 1, b"abc");
        cell.update(b"a much longer value than before");
        assert_eq!(cell.read(), b"a much longer value than before");
        cell.update(b"");
        assert_eq!(cell.read(), b"");
    }

    #[test]
    fn matches_requires_fingerprint_and_bytes() {
        let cell = Cell::create(b"mykey", 42, b"v");
        assert!(cell.matches(b"mykey", 42));
        assert!(!cell.matches(b"mykey", 43));
        assert!(!cell.matches(b"otherkey", 42));
    }
}
