// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-capacity circular history of outcome records.
//!
//! # Invariants
//!
//! - `len <= capacity`, and `head` and `tail` are in `[0, capacity)` (both are
//!   0 when the capacity is 0).
//! - The logical element `i` (oldest first) for `i` in `[0, len)` lives at
//!   `slots[(head + i) % capacity]`.
//! - Insertion always happens at `tail`. When the buffer is full, insertion
//!   also advances `head`, dropping the oldest record.
//!
//! A buffer restored from its persisted form keeps whatever `head`, `tail` and
//! `len` were recorded. Only the index bounds are checked at load time, so a
//! blob whose declared length disagrees with its slot contents produces a
//! buffer whose queries are wrong (for example, [`HistoryBuffer::ordered`]
//! returning fewer than `len` records). See [`crate::serialize`].

use crate::{outcome::OutcomeRecord, serialize::SerializedHistory};
use serde::{Deserialize, Serialize};

/// A bounded rolling window of outcome records, overwriting the oldest record
/// once full.
///
/// Cloning a history across runs is always a value copy, through
/// [`HistoryBuffer::from_records`] or [`HistoryBuffer::resized_copy`]: a new
/// run never mutates a buffer that belongs to a previous run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(into = "SerializedHistory", try_from = "SerializedHistory")]
pub struct HistoryBuffer {
    slots: Vec<Option<OutcomeRecord>>,
    head: usize,
    tail: usize,
    len: usize,
}

impl HistoryBuffer {
    /// Creates an empty buffer holding at most `capacity` records.
    ///
    /// A capacity of 0 is legal: such a buffer silently drops every record.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Creates a buffer of the given capacity and pushes `records` into it in
    /// order, so that only the last `capacity` of them are retained.
    pub fn from_records<I>(capacity: usize, records: I) -> Self
    where
        I: IntoIterator<Item = OutcomeRecord>,
    {
        let mut buffer = Self::new(capacity);
        buffer.add_all(records);
        buffer
    }

    /// Copies this buffer's chronological records into a fresh buffer with a
    /// (possibly different) capacity.
    pub fn resized_copy(&self, capacity: usize) -> Self {
        Self::from_records(capacity, self.iter().copied())
    }

    /// Restores a buffer from its raw parts.
    ///
    /// The caller guarantees that `head` and `tail` index into `slots` (or are
    /// 0 for an empty slot array) and that `len <= slots.len()`. Consistency
    /// between `len` and the occupied slots is not checked.
    pub(crate) fn from_raw_parts(
        slots: Vec<Option<OutcomeRecord>>,
        head: usize,
        tail: usize,
        len: usize,
    ) -> Self {
        debug_assert!(len <= slots.len(), "len {len} exceeds capacity");
        Self {
            slots,
            head,
            tail,
            len,
        }
    }

    /// Returns the maximum number of records this buffer retains.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of records currently retained.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the buffer has zero capacity.
    ///
    /// This is *not* the same as "no records are stored": a buffer with a
    /// non-zero capacity and no records is not empty by this definition. A
    /// zero-capacity buffer is permanently empty since it never accepts
    /// records. Use [`Self::len`] to check whether any records are retained.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns true if the next insertion will evict the oldest record (or, for
    /// a zero-capacity buffer, be dropped).
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Appends a record, evicting the oldest one if the buffer is full.
    ///
    /// Returns false, leaving the buffer unchanged, if the capacity is 0.
    pub fn add(&mut self, record: OutcomeRecord) -> bool {
        let capacity = self.slots.len();
        if capacity == 0 {
            return false;
        }

        self.slots[self.tail] = Some(record);
        self.tail = (self.tail + 1) % capacity;

        if self.len == capacity {
            self.head = (self.head + 1) % capacity;
        } else {
            self.len += 1;
        }
        true
    }

    /// Appends every record in `records`, in order.
    pub fn add_all<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = OutcomeRecord>,
    {
        for record in records {
            self.add(record);
        }
    }

    /// Iterates over the retained records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &OutcomeRecord> + '_ {
        let capacity = self.slots.len();
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) % capacity].as_ref())
    }

    /// Returns a snapshot of the retained records, oldest first.
    ///
    /// The snapshot does not alias the buffer's storage.
    pub fn ordered(&self) -> Vec<OutcomeRecord> {
        self.iter().copied().collect()
    }

    /// Returns the most recently inserted record.
    pub fn latest(&self) -> Option<&OutcomeRecord> {
        if self.len == 0 {
            return None;
        }
        self.slots[self.prev_index(self.tail)].as_ref()
    }

    /// Returns true if no record is retained or every retained record passed.
    ///
    /// Only the logical window is scanned: records that were evicted are never
    /// considered, even if their slot has not been overwritten yet.
    pub fn all_passed(&self) -> bool {
        self.iter().all(|record| record.passed())
    }

    /// Returns true if the second most recently inserted record passed and the
    /// most recently inserted one failed.
    ///
    /// Always false with fewer than two records.
    pub fn is_most_recent_regressed(&self) -> bool {
        if self.len < 2 {
            return false;
        }

        let last = self.prev_index(self.tail);
        let second_last = self.prev_index(last);
        match (&self.slots[second_last], &self.slots[last]) {
            (Some(before), Some(after)) => before.passed() && after.failed(),
            _ => false,
        }
    }

    // ---
    // Raw accessors for the persisted form
    // ---

    #[inline]
    pub(crate) fn head(&self) -> usize {
        self.head
    }

    #[inline]
    pub(crate) fn tail(&self) -> usize {
        self.tail
    }

    #[inline]
    pub(crate) fn slots(&self) -> &[Option<OutcomeRecord>] {
        &self.slots
    }

    /// Index of the slot before `index`, wrapping around. Requires a non-zero
    /// capacity.
    #[inline]
    fn prev_index(&self, index: usize) -> usize {
        let capacity = self.slots.len();
        (index + capacity - 1) % capacity
    }
}
