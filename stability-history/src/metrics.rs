// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stability metrics derived from a chronological sequence of outcomes.
//!
//! All percentages use truncating integer division and are recomputed from the
//! records on every call. Nothing is cached, so there is no incremental state to
//! keep in sync as a [`HistoryBuffer`] wraps around.

use crate::{buffer::HistoryBuffer, outcome::OutcomeRecord};
use serde::Serialize;

/// Returns the number of failing records.
pub fn failed_count<'a, I>(records: I) -> usize
where
    I: IntoIterator<Item = &'a OutcomeRecord>,
{
    records.into_iter().filter(|record| record.failed()).count()
}

/// Returns the number of adjacent pairs whose pass/fail status differs.
pub fn status_changes<'a, I>(records: I) -> usize
where
    I: IntoIterator<Item = &'a OutcomeRecord>,
{
    let mut previous: Option<bool> = None;
    let mut changes = 0;
    for record in records {
        if previous.is_some_and(|passed| passed != record.passed()) {
            changes += 1;
        }
        previous = Some(record.passed());
    }
    changes
}

/// Returns the percentage of passing records.
///
/// An empty sequence has a stability of 100.
pub fn stability<'a, I>(records: I) -> u32
where
    I: IntoIterator<Item = &'a OutcomeRecord>,
{
    let (size, failed) = records
        .into_iter()
        .fold((0usize, 0usize), |(size, failed), record| {
            (size + 1, failed + usize::from(record.failed()))
        });
    stability_percent(size, failed)
}

/// Returns the percentage of adjacent pairs whose status differs.
///
/// Sequences of zero or one records have a flakiness of 0.
pub fn flakiness<'a, I>(records: I) -> u32
where
    I: IntoIterator<Item = &'a OutcomeRecord>,
{
    let mut size = 0;
    let changes = status_changes(records.into_iter().inspect(|_| size += 1));
    flakiness_percent(size, changes)
}

fn stability_percent(size: usize, failed: usize) -> u32 {
    if size == 0 {
        return 100;
    }
    percent(size - failed, size)
}

fn flakiness_percent(size: usize, changes: usize) -> u32 {
    if size <= 1 {
        return 0;
    }
    percent(changes, size - 1)
}

fn percent(numerator: usize, denominator: usize) -> u32 {
    // numerator <= denominator, so the result always fits.
    (100 * numerator / denominator) as u32
}

/// A snapshot of every metric for one history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StabilityMetrics {
    /// The number of records in the window.
    pub size: usize,

    /// The number of failing records in the window.
    pub failed: usize,

    /// The percentage of passing records.
    pub stability: u32,

    /// The percentage of adjacent pairs whose status differs.
    pub flakiness: u32,
}

impl StabilityMetrics {
    /// Computes all metrics for the given records, oldest first.
    pub fn compute<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a OutcomeRecord>,
    {
        let mut size = 0;
        let mut failed = 0;
        let changes = status_changes(records.into_iter().inspect(|record| {
            size += 1;
            failed += usize::from(record.failed());
        }));

        Self {
            size,
            failed,
            stability: stability_percent(size, failed),
            flakiness: flakiness_percent(size, changes),
        }
    }

    /// Computes all metrics for the records retained by `buffer`.
    pub fn for_buffer(buffer: &HistoryBuffer) -> Self {
        Self::compute(buffer.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;
    use test_strategy::proptest;

    fn history(outcomes: &[bool]) -> Vec<OutcomeRecord> {
        outcomes
            .iter()
            .enumerate()
            .map(|(i, &passed)| OutcomeRecord::new(i as u64, passed))
            .collect()
    }

    #[test_case(&[], 100 ; "empty")]
    #[test_case(&[true], 100 ; "single pass")]
    #[test_case(&[false], 0 ; "single fail")]
    #[test_case(&[true, true, false], 66 ; "truncates toward zero")]
    #[test_case(&[false, false, true], 33 ; "one third")]
    #[test_case(&[true, false, true, false], 50 ; "half")]
    fn stability_values(outcomes: &[bool], expected: u32) {
        assert_eq!(stability(&history(outcomes)), expected);
    }

    #[test_case(&[], 0 ; "empty")]
    #[test_case(&[false], 0 ; "single record")]
    #[test_case(&[true, true, true], 0 ; "no changes")]
    #[test_case(&[true, false, false, false], 33 ; "one change in three gaps")]
    #[test_case(&[true, false, true, false, true, false, true, false, true, false], 100 ; "alternating")]
    fn flakiness_values(outcomes: &[bool], expected: u32) {
        assert_eq!(flakiness(&history(outcomes)), expected);
    }

    #[test]
    fn flakiness_of_wrapped_pattern() {
        // [pass, pass, fail, fail] repeated, truncated to 101 records.
        let pattern = [true, true, false, false];
        let outcomes: Vec<bool> = pattern.iter().copied().cycle().take(101).collect();
        let buffer = HistoryBuffer::from_records(101, history(&outcomes));

        assert_eq!(buffer.len(), 101);
        assert_eq!(flakiness(buffer.iter()), 50);
    }

    #[test]
    fn flakiness_after_wraparound_uses_window_only() {
        // The leading failure is evicted, so only the trailing passes count.
        let mut buffer = HistoryBuffer::new(3);
        buffer.add_all(history(&[false, true, true, true]));
        assert_eq!(flakiness(buffer.iter()), 0);
        assert_eq!(stability(buffer.iter()), 100);
        assert_eq!(failed_count(buffer.iter()), 0);
    }

    #[test]
    fn snapshot() {
        let buffer = HistoryBuffer::from_records(10, history(&[true, false, false, true, true]));
        assert_eq!(
            StabilityMetrics::for_buffer(&buffer),
            StabilityMetrics {
                size: 5,
                failed: 2,
                stability: 60,
                flakiness: 50,
            }
        );
    }

    #[proptest]
    fn all_passing_is_fully_stable(#[strategy(0usize..64)] size: usize) {
        let records = history(&vec![true; size]);
        prop_assert_eq!(stability(&records), 100);
        prop_assert_eq!(flakiness(&records), 0);
    }

    #[proptest]
    fn snapshot_agrees_with_individual_metrics(
        #[strategy(proptest::collection::vec(any::<bool>(), 0..40))] outcomes: Vec<bool>,
    ) {
        let records = history(&outcomes);
        let metrics = StabilityMetrics::compute(&records);
        prop_assert_eq!(metrics.size, records.len());
        prop_assert_eq!(metrics.failed, failed_count(&records));
        prop_assert_eq!(metrics.stability, stability(&records));
        prop_assert_eq!(metrics.flakiness, flakiness(&records));
        prop_assert!(metrics.stability <= 100);
        prop_assert!(metrics.flakiness <= 100);
    }
}
