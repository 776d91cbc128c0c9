// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by stability histories.

use crate::tree::NodeId;
use std::num::ParseIntError;
use thiserror::Error;

/// An error that occurred while decoding the persisted form of a
/// [`HistoryBuffer`](crate::HistoryBuffer).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum HistoryParseError {
    /// One of the `head`, `tail` or `size` fields is not a valid integer.
    #[error("invalid value for `{field}`: {input:?}")]
    InvalidField {
        /// The name of the field.
        field: &'static str,

        /// The text that failed to parse.
        input: String,

        /// The underlying error.
        #[source]
        err: ParseIntError,
    },

    /// A slot token is not of the form `<run-id>;<marker>`.
    #[error("slot {index}: expected `<run-id>;<marker>`, found {token:?}")]
    MalformedSlot {
        /// The raw index of the slot.
        index: usize,

        /// The token found at that slot.
        token: String,
    },

    /// A slot's run ID is not a valid integer.
    #[error("slot {index}: invalid run ID {input:?}")]
    InvalidRunId {
        /// The raw index of the slot.
        index: usize,

        /// The text that failed to parse.
        input: String,

        /// The underlying error.
        #[source]
        err: ParseIntError,
    },

    /// A slot's marker is neither `1` (passed) nor `0` (failed).
    #[error("slot {index}: unrecognized outcome marker {marker:?} (expected `1` or `0`)")]
    InvalidMarker {
        /// The raw index of the slot.
        index: usize,

        /// The marker found.
        marker: String,
    },

    /// `head`, `tail` or `size` does not fit the decoded slot array.
    #[error("`{field}` is {value}, which is out of range for {capacity} slots")]
    OutOfRange {
        /// The name of the field.
        field: &'static str,

        /// The declared value.
        value: usize,

        /// The number of decoded slots.
        capacity: usize,
    },
}

/// An error returned by [`HistoryTree::attach_child`](crate::HistoryTree::attach_child).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttachChildError {
    /// The child is already attached to a different parent.
    #[error("node {child} is already attached to parent {existing_parent}")]
    AlreadyAttached {
        /// The node being attached.
        child: NodeId,

        /// The parent the node is currently attached to.
        existing_parent: NodeId,
    },

    /// The child is the parent itself or one of its ancestors.
    #[error("attaching node {child} to {parent} would create a cycle")]
    WouldCycle {
        /// The intended parent.
        parent: NodeId,

        /// The node being attached.
        child: NodeId,
    },
}

/// An error that occurred while parsing stability configuration.
#[derive(Debug, Error)]
#[error("failed to parse stability config from {source_name}")]
#[non_exhaustive]
pub struct ConfigParseError {
    source_name: String,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(source_name: impl Into<String>, kind: ConfigParseErrorKind) -> Self {
        Self {
            source_name: source_name.into(),
            kind,
        }
    }

    /// Returns a description of where the configuration came from.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing stability configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// The TOML could not be deserialized.
    #[error("error deserializing TOML")]
    Deserialize(#[source] Box<toml::de::Error>),

    /// The history length is zero.
    #[error("`max-history-length` must be greater than 0")]
    ZeroHistoryLength,
}
