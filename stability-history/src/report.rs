// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable views over histories.
//!
//! This module composes text and serializable data for reports. Delivering
//! them anywhere is up to the caller.

use crate::{
    collect::CollectedHistories,
    helpers::plural,
    metrics::StabilityMetrics,
    outcome::{OutcomeRecord, RunId},
    tree::{HistoryNode, HistoryTree, NodeId},
};
use owo_colors::{OwoColorize, Style};
use serde::Serialize;
use std::fmt;

/// The value reported in place of a child's metric when there is no child.
pub const NO_CHILD: i32 = -1;

/// Styles for displaying reports.
#[derive(Clone, Debug, Default)]
pub struct Styles {
    /// Style for unit IDs.
    pub unit: Style,
    /// Style for counts and percentages.
    pub count: Style,
    /// Style for the regression header.
    pub failed: Style,
}

impl Styles {
    /// Colorizes the styles for terminal output.
    pub fn colorize(&mut self) {
        self.unit = Style::new().bold();
        self.count = Style::new().bold();
        self.failed = Style::new().bold().red();
    }
}

// ---
// Transitions
// ---

/// How a run's outcome compares with the run before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TransitionStatus {
    /// Passed, and either the previous run passed or there was none.
    Pass,
    /// Failed, and either the previous run failed or there was none.
    Fail,
    /// Failed after a passing run.
    Regression,
    /// Passed after a failing run.
    Fixed,
}

impl TransitionStatus {
    /// Returns the label for this status.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::Regression => "Regression",
            Self::Fixed => "Fixed",
        }
    }
}

impl fmt::Display for TransitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry in a history's transition list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Transition {
    /// The run this entry describes.
    pub run_id: RunId,
    /// The outcome relative to the previous run.
    pub status: TransitionStatus,
}

/// Labels each record by comparing it with its chronological predecessor.
pub fn transitions<'a, I>(records: I) -> Vec<Transition>
where
    I: IntoIterator<Item = &'a OutcomeRecord>,
{
    let mut previous: Option<bool> = None;
    records
        .into_iter()
        .map(|record| {
            let status = match (previous, record.passed()) {
                (Some(true), false) => TransitionStatus::Regression,
                (Some(false), true) => TransitionStatus::Fixed,
                (_, true) => TransitionStatus::Pass,
                (_, false) => TransitionStatus::Fail,
            };
            previous = Some(record.passed());
            Transition {
                run_id: record.run_id(),
                status,
            }
        })
        .collect()
}

// ---
// Node summaries
// ---

/// A child singled out by a summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildFigure {
    /// The child's name.
    pub name: String,
    /// The child's flakiness or stability, depending on the query.
    pub value: u32,
}

/// Figures describing one node and its least reliable children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSummary {
    metrics: StabilityMetrics,
    flakiest_child: Option<ChildFigure>,
    least_stable_child: Option<ChildFigure>,
}

impl NodeSummary {
    /// Summarizes the node `id` in `tree`.
    pub fn new(tree: &HistoryTree, id: NodeId) -> Self {
        let figure = |child: NodeId, value: fn(&HistoryNode) -> u32| {
            let node = tree.node(child);
            ChildFigure {
                name: node.name().to_owned(),
                value: value(node),
            }
        };

        Self {
            metrics: tree.node(id).metrics(),
            flakiest_child: tree
                .flakiest_child(id)
                .map(|child| figure(child, HistoryNode::flakiness)),
            least_stable_child: tree
                .least_stable_child(id)
                .map(|child| figure(child, HistoryNode::stability)),
        }
    }

    /// Returns the node's own metrics.
    pub fn metrics(&self) -> &StabilityMetrics {
        &self.metrics
    }

    /// Returns the flakiest direct child, if any.
    pub fn flakiest_child(&self) -> Option<&ChildFigure> {
        self.flakiest_child.as_ref()
    }

    /// Returns the least stable direct child, if any.
    pub fn least_stable_child(&self) -> Option<&ChildFigure> {
        self.least_stable_child.as_ref()
    }

    /// Returns the name of the flakiest child, or `"No flaky tests"`.
    pub fn flakiest_child_name(&self) -> &str {
        self.flakiest_child
            .as_ref()
            .map_or("No flaky tests", |child| &child.name)
    }

    /// Returns the flakiness of the flakiest child, or [`NO_CHILD`].
    pub fn flakiest_child_flakiness(&self) -> i32 {
        figure_or_sentinel(self.flakiest_child.as_ref())
    }

    /// Returns the name of the least stable child, or `"No unstable tests"`.
    pub fn least_stable_child_name(&self) -> &str {
        self.least_stable_child
            .as_ref()
            .map_or("No unstable tests", |child| &child.name)
    }

    /// Returns the stability of the least stable child, or [`NO_CHILD`].
    pub fn least_stable_child_stability(&self) -> i32 {
        figure_or_sentinel(self.least_stable_child.as_ref())
    }

    /// Returns a one-line description of the node's history.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for NodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let StabilityMetrics {
            size,
            failed,
            stability,
            flakiness,
        } = self.metrics;
        if stability == 100 {
            write!(f, "No known failures. Flakiness 0%, Stability 100%")
        } else {
            write!(
                f,
                "Failed {failed} times in the last {size} runs. \
                 Flakiness: {flakiness}%, Stability: {stability}%"
            )
        }
    }
}

fn figure_or_sentinel(figure: Option<&ChildFigure>) -> i32 {
    // Percentages are at most 100, so the conversion never saturates.
    figure.map_or(NO_CHILD, |figure| {
        i32::try_from(figure.value).unwrap_or(i32::MAX)
    })
}

// ---
// Regression reports
// ---

/// A list of units whose most recent outcome regressed.
#[derive(Clone, Debug, Default)]
pub struct RegressionReport {
    author: Option<String>,
    regressions: Vec<(String, StabilityMetrics)>,
}

impl RegressionReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every publishable unit in `collected` whose latest run
    /// regressed.
    pub fn from_collected(collected: &CollectedHistories) -> Self {
        let mut report = Self::new();
        for (unit_id, id) in collected.units() {
            let node = &collected.tree()[id];
            if node.should_publish() && node.is_most_recent_regressed() {
                report.add(unit_id, node);
            }
        }
        report
    }

    /// Sets the author credited with the run.
    pub fn set_author(&mut self, author: impl Into<String>) -> &mut Self {
        self.author = Some(author.into());
        self
    }

    /// Adds a unit to the report.
    pub fn add(&mut self, unit_id: impl Into<String>, node: &HistoryNode) -> &mut Self {
        self.regressions.push((unit_id.into(), node.metrics()));
        self
    }

    /// Returns the number of regressed units.
    pub fn len(&self) -> usize {
        self.regressions.len()
    }

    /// Returns true if no unit regressed.
    pub fn is_empty(&self) -> bool {
        self.regressions.is_empty()
    }

    /// Iterates over regressed unit IDs and their metrics.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StabilityMetrics)> + '_ {
        self.regressions
            .iter()
            .map(|(unit_id, metrics)| (unit_id.as_str(), metrics))
    }

    /// Returns a displayer for this report. An empty report displays as
    /// nothing.
    pub fn display<'a>(&'a self, styles: &'a Styles) -> DisplayRegressionReport<'a> {
        DisplayRegressionReport {
            report: self,
            styles,
        }
    }
}

/// Displays a [`RegressionReport`].
#[derive(Clone, Debug)]
pub struct DisplayRegressionReport<'a> {
    report: &'a RegressionReport,
    styles: &'a Styles,
}

impl fmt::Display for DisplayRegressionReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.report.len();
        if count == 0 {
            return Ok(());
        }

        write!(
            f,
            "{} {} found",
            count.style(self.styles.count),
            plural::regressions_str(count).style(self.styles.failed),
        )?;
        if let Some(author) = &self.report.author {
            write!(f, ". Author: {author}")?;
        }
        writeln!(f)?;

        for (unit_id, metrics) in self.report.iter() {
            writeln!(
                f,
                "  {} Failed {} times in the last {} runs. Flakiness: {}%, Stability: {}%",
                unit_id.style(self.styles.unit),
                metrics.failed.style(self.styles.count),
                metrics.size.style(self.styles.count),
                metrics.flakiness.style(self.styles.count),
                metrics.stability.style(self.styles.count),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::HistoryBuffer;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn records(outcomes: &[bool]) -> Vec<OutcomeRecord> {
        outcomes
            .iter()
            .enumerate()
            .map(|(i, &passed)| OutcomeRecord::new(i as u64 + 100, passed))
            .collect()
    }

    fn node(name: &str, outcomes: &[bool]) -> HistoryNode {
        let mut node = HistoryNode::with_buffer(HistoryBuffer::from_records(10, records(outcomes)));
        node.set_name(name);
        node
    }

    #[test]
    fn transition_labels() {
        let labels: Vec<_> = transitions(&records(&[false, true, true, false, false, true]))
            .into_iter()
            .map(|transition| transition.status.to_string())
            .collect();
        assert_eq!(
            labels,
            vec!["Fail", "Fixed", "Pass", "Regression", "Fail", "Fixed"]
        );
        assert_eq!(transitions(&records(&[])), vec![]);
    }

    #[test]
    fn transitions_serialize_to_json() {
        let json = serde_json::to_value(transitions(&records(&[true, false]))).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "run-id": 100, "status": "Pass" },
                { "run-id": 101, "status": "Regression" },
            ])
        );
    }

    #[test]
    fn summary_without_children() {
        let mut tree = HistoryTree::new();
        let id = tree.insert(node("case", &[true, true]));
        let summary = NodeSummary::new(&tree, id);

        assert_eq!(
            summary.description(),
            "No known failures. Flakiness 0%, Stability 100%"
        );
        assert_eq!(summary.flakiest_child_name(), "No flaky tests");
        assert_eq!(summary.flakiest_child_flakiness(), NO_CHILD);
        assert_eq!(summary.least_stable_child_name(), "No unstable tests");
        assert_eq!(summary.least_stable_child_stability(), NO_CHILD);
    }

    #[test]
    fn summary_with_children() {
        let mut tree = HistoryTree::new();
        let root = tree.insert(node("class", &[true, false, true, true]));
        let steady = tree.insert(node("steady", &[true, true, true, true]));
        let broken = tree.insert(node("broken", &[false, false, false, true]));
        let flaky = tree.insert(node("flaky", &[true, false, true, true]));
        for child in [steady, broken, flaky] {
            tree.attach_child(root, child).unwrap();
        }

        let summary = NodeSummary::new(&tree, root);
        assert_eq!(
            summary.description(),
            "Failed 1 times in the last 4 runs. Flakiness: 66%, Stability: 75%"
        );
        assert_eq!(summary.flakiest_child_name(), "flaky");
        assert_eq!(summary.flakiest_child_flakiness(), 66);
        assert_eq!(summary.least_stable_child_name(), "broken");
        assert_eq!(summary.least_stable_child_stability(), 25);
    }

    #[test]
    fn regression_report_display() {
        let mut report = RegressionReport::new();
        assert_eq!(report.display(&Styles::default()).to_string(), "");

        report
            .set_author("jdoe")
            .add("suite/mod_a/test_one", &node("test_one", &[true, true, false]))
            .add("suite/mod_b/test_two", &node("test_two", &[false, true, false]));

        assert_eq!(
            report.display(&Styles::default()).to_string(),
            indoc! {"
                2 regressions found. Author: jdoe
                  suite/mod_a/test_one Failed 1 times in the last 3 runs. Flakiness: 50%, Stability: 66%
                  suite/mod_b/test_two Failed 2 times in the last 3 runs. Flakiness: 100%, Stability: 33%
            "}
        );
    }

    #[test]
    fn regression_report_without_author() {
        let mut report = RegressionReport::new();
        report.add("case", &node("case", &[true, false]));
        assert_eq!(
            report.display(&Styles::default()).to_string(),
            "1 regression found\n  case Failed 1 times in the last 2 runs. \
             Flakiness: 100%, Stability: 50%\n"
        );
    }
}
