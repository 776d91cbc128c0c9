// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The persisted form of a [`HistoryBuffer`].
//!
//! A buffer is stored as four text fields:
//!
//! - `head`, `tail` and `size`: decimal integers, copied verbatim from the
//!   buffer's bookkeeping.
//! - `slots`: one token per backing slot, in raw array order (not logical
//!   order), joined by `,`. An empty slot is an empty token, and an occupied
//!   slot is `<run-id>;1` for a pass or `<run-id>;0` for a failure.
//!
//! For example, a capacity-4 buffer that has seen runs 7 (pass), 8 (fail) and
//! 9 (pass) is stored with head 0, tail 3, size 3 and slots `7;1,8;0,9;1,`.
//!
//! There is no version field: changing this layout requires an external
//! migration.
//!
//! # Decoding policy
//!
//! Markers are parsed strictly: anything other than `1` or `0` is rejected.
//! `head`, `tail` and `size` must fit the decoded slot array, which keeps
//! indexing in bounds. Beyond that, the declared bookkeeping is trusted: a blob
//! whose `size` disagrees with the occupied slots decodes into a buffer whose
//! queries are wrong. This is logged but not corrected.
//!
//! An empty `slots` field decodes as a single empty slot, so a zero-capacity
//! buffer comes back with a capacity of 1.

use crate::{buffer::HistoryBuffer, errors::HistoryParseError, outcome::OutcomeRecord};
use serde::{Deserialize, Serialize};
use swrite::{SWrite, swrite};
use tracing::warn;

/// Separates slot tokens.
pub const SLOT_SEPARATOR: char = ',';

/// Separates the run ID from the outcome marker within a slot token.
pub const OUTCOME_SEPARATOR: char = ';';

const PASSED_MARKER: &str = "1";
const FAILED_MARKER: &str = "0";

/// The four persisted fields of a [`HistoryBuffer`].
///
/// This type is what the buffer's `Serialize` and `Deserialize` impls go
/// through, so any serde format can be used by the store that owns the data.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SerializedHistory {
    /// The raw index of the oldest record.
    pub head: String,

    /// The raw index at which the next record will be written.
    pub tail: String,

    /// The number of records in the window.
    pub size: String,

    /// The slot tokens, in raw array order.
    pub slots: String,
}

impl SerializedHistory {
    /// Encodes a buffer.
    pub fn encode(buffer: &HistoryBuffer) -> Self {
        Self {
            head: buffer.head().to_string(),
            tail: buffer.tail().to_string(),
            size: buffer.len().to_string(),
            slots: encode_slots(buffer.slots()),
        }
    }

    /// Decodes a buffer, restoring `head`, `tail` and `size` verbatim.
    pub fn decode(&self) -> Result<HistoryBuffer, HistoryParseError> {
        let head = parse_field("head", &self.head)?;
        let tail = parse_field("tail", &self.tail)?;
        let size = parse_field("size", &self.size)?;
        let slots = decode_slots(&self.slots)?;

        let capacity = slots.len();
        check_index("head", head, capacity)?;
        check_index("tail", tail, capacity)?;
        if size > capacity {
            return Err(HistoryParseError::OutOfRange {
                field: "size",
                value: size,
                capacity,
            });
        }

        let occupied = (0..size)
            .filter(|i| slots[(head + i) % capacity].is_some())
            .count();
        if occupied != size {
            warn!(
                "persisted history declares {size} records, but only {occupied} \
                 slots in its window are occupied (head {head}, tail {tail})",
            );
        }

        Ok(HistoryBuffer::from_raw_parts(slots, head, tail, size))
    }
}

impl From<HistoryBuffer> for SerializedHistory {
    fn from(buffer: HistoryBuffer) -> Self {
        Self::encode(&buffer)
    }
}

impl TryFrom<SerializedHistory> for HistoryBuffer {
    type Error = HistoryParseError;

    fn try_from(serialized: SerializedHistory) -> Result<Self, Self::Error> {
        serialized.decode()
    }
}

/// Encodes a raw slot array into its token list.
pub fn encode_slots(slots: &[Option<OutcomeRecord>]) -> String {
    let mut out = String::new();
    for (index, slot) in slots.iter().enumerate() {
        if index > 0 {
            out.push(SLOT_SEPARATOR);
        }
        if let Some(record) = slot {
            let marker = if record.passed() {
                PASSED_MARKER
            } else {
                FAILED_MARKER
            };
            swrite!(out, "{}{}{}", record.run_id(), OUTCOME_SEPARATOR, marker);
        }
    }
    out
}

/// Decodes a token list into a raw slot array, one slot per token.
pub fn decode_slots(input: &str) -> Result<Vec<Option<OutcomeRecord>>, HistoryParseError> {
    input
        .split(SLOT_SEPARATOR)
        .enumerate()
        .map(|(index, token)| {
            if token.is_empty() {
                Ok(None)
            } else {
                decode_token(index, token).map(Some)
            }
        })
        .collect()
}

fn decode_token(index: usize, token: &str) -> Result<OutcomeRecord, HistoryParseError> {
    let (run_id, marker) = token.split_once(OUTCOME_SEPARATOR).ok_or_else(|| {
        HistoryParseError::MalformedSlot {
            index,
            token: token.to_owned(),
        }
    })?;

    let run_id = run_id
        .parse()
        .map_err(|err| HistoryParseError::InvalidRunId {
            index,
            input: run_id.to_owned(),
            err,
        })?;

    let passed = match marker {
        PASSED_MARKER => true,
        FAILED_MARKER => false,
        other => {
            return Err(HistoryParseError::InvalidMarker {
                index,
                marker: other.to_owned(),
            });
        }
    };

    Ok(OutcomeRecord::new(run_id, passed))
}

fn parse_field(field: &'static str, input: &str) -> Result<usize, HistoryParseError> {
    input
        .parse()
        .map_err(|err| HistoryParseError::InvalidField {
            field,
            input: input.to_owned(),
            err,
        })
}

fn check_index(
    field: &'static str,
    value: usize,
    capacity: usize,
) -> Result<(), HistoryParseError> {
    if value < capacity {
        Ok(())
    } else {
        Err(HistoryParseError::OutOfRange {
            field,
            value,
            capacity,
        })
    }
}
