// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A single run's outcome for a monitored unit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The ordinal identifying a run.
///
/// Run IDs increase monotonically across runs, but the history never relies on
/// that: ordering is always insertion order.
pub type RunId = u64;

/// One run's pass/fail result, tagged with the run that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub struct OutcomeRecord {
    run_id: RunId,
    passed: bool,
}

impl OutcomeRecord {
    /// Creates a new record.
    #[inline]
    pub fn new(run_id: RunId, passed: bool) -> Self {
        Self { run_id, passed }
    }

    /// Creates a passing record.
    #[inline]
    pub fn pass(run_id: RunId) -> Self {
        Self::new(run_id, true)
    }

    /// Creates a failing record.
    #[inline]
    pub fn fail(run_id: RunId) -> Self {
        Self::new(run_id, false)
    }

    /// Returns the run this record belongs to.
    #[inline]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Returns true if the unit passed in this run.
    #[inline]
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Returns true if the unit failed in this run.
    #[inline]
    pub fn failed(&self) -> bool {
        !self.passed
    }
}

impl fmt::Display for OutcomeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "pass" } else { "fail" };
        write!(f, "{}:{status}", self.run_id)
    }
}
