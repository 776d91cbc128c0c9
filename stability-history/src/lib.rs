// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Rolling pass/fail histories for tests, with stability and flakiness metrics.
//!
//! Each monitored unit (a test case, and every class, suite and report above
//! it) keeps a bounded window of its most recent outcomes in a
//! [`HistoryBuffer`]. From that window the [`metrics`] module derives:
//!
//! - **stability**: the percentage of runs that passed;
//! - **flakiness**: the percentage of consecutive runs whose outcome differs;
//! - the failure count, and whether the latest run was a regression.
//!
//! Histories form a [`HistoryTree`] mirroring the test hierarchy, which can
//! answer "which child is flakiest" or "which child is least stable".
//!
//! # Run-over-run flow
//!
//! 1. Load the previous run's [`PreviousHistories`] from wherever they are
//!    stored. Each buffer serializes to a compact four-field form (see
//!    [`serialize`]).
//! 2. Build this run's tree with a [`HistoryCollector`], which copies each
//!    unit's previous history into a fresh buffer and appends the new outcome.
//! 3. Query the tree, or use [`report`] to produce summaries and regression
//!    reports.
//! 4. Persist [`CollectedHistories::snapshot`] for the next run.

mod buffer;
pub mod collect;
pub mod config;
pub mod errors;
mod helpers;
pub mod metrics;
mod outcome;
pub mod report;
pub mod serialize;
mod tree;

pub use buffer::HistoryBuffer;
pub use collect::{CollectedHistories, HistoryCollector, PreviousHistories, UnitOutcome};
pub use config::StabilityConfig;
pub use metrics::StabilityMetrics;
pub use outcome::{OutcomeRecord, RunId};
pub use serialize::SerializedHistory;
pub use tree::{HistoryNode, HistoryTree, NodeId};
