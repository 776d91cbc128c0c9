// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Building a run's history tree from a JUnit report.
//!
//! The tree mirrors the report's hierarchy:
//!
//! ```text
//! report
//! └─ test suite
//!    └─ class (the test case's `classname`, or the suite name if absent)
//!       └─ test case
//! ```
//!
//! Each unit is identified by the `/`-joined names on its path from the
//! report, for example `my-run/my-suite/my_mod::tests/test_foo`. That ID is
//! used to look up the unit's history from the previous run.

use crate::{
    buffer::HistoryBuffer,
    config::StabilityConfig,
    outcome::{OutcomeRecord, RunId},
    tree::{HistoryNode, HistoryTree, NodeId},
};
use indexmap::IndexMap;
use quick_junit::{Report, TestCase, TestCaseStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Histories from a previous run, keyed by unit ID.
///
/// This is the value an external store persists between runs. Each buffer
/// serializes to its four-field persisted form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PreviousHistories {
    histories: IndexMap<String, HistoryBuffer>,
}

impl PreviousHistories {
    /// Creates an empty set of histories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the history for a unit.
    pub fn insert(&mut self, unit_id: impl Into<String>, history: HistoryBuffer) {
        self.histories.insert(unit_id.into(), history);
    }

    /// Returns the history for a unit, if one was recorded.
    pub fn get(&self, unit_id: &str) -> Option<&HistoryBuffer> {
        self.histories.get(unit_id)
    }

    /// Returns the number of units with a history.
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    /// Returns true if no unit has a history.
    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    /// Iterates over unit IDs and their histories.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HistoryBuffer)> + '_ {
        self.histories
            .iter()
            .map(|(unit_id, history)| (unit_id.as_str(), history))
    }
}

/// How a unit fared in a single run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitOutcome {
    /// The unit passed.
    Passed,

    /// The unit failed.
    Failed,

    /// The unit did not run. Its history is left unchanged.
    Skipped,
}

impl UnitOutcome {
    /// Returns the outcome of a single test case.
    pub fn for_test_case(test_case: &TestCase) -> Self {
        match &test_case.status {
            TestCaseStatus::Success { .. } => Self::Passed,
            TestCaseStatus::NonSuccess { .. } => Self::Failed,
            TestCaseStatus::Skipped { .. } => Self::Skipped,
        }
    }

    /// Combines the outcomes of an aggregate's test cases.
    ///
    /// An aggregate fails if any test case failed, passes if at least one test
    /// case passed and none failed, and is skipped otherwise.
    pub fn aggregate<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        outcomes
            .into_iter()
            .fold(Self::Skipped, |acc, outcome| match (acc, outcome) {
                (Self::Failed, _) | (_, Self::Failed) => Self::Failed,
                (Self::Passed, _) | (_, Self::Passed) => Self::Passed,
                (Self::Skipped, Self::Skipped) => Self::Skipped,
            })
    }

    /// Converts this outcome into a record for the given run, or `None` if the
    /// unit was skipped.
    pub fn to_record(self, run_id: RunId) -> Option<OutcomeRecord> {
        match self {
            Self::Passed => Some(OutcomeRecord::pass(run_id)),
            Self::Failed => Some(OutcomeRecord::fail(run_id)),
            Self::Skipped => None,
        }
    }
}

/// Builds history trees for successive runs.
#[derive(Clone, Copy, Debug)]
pub struct HistoryCollector<'a> {
    config: &'a StabilityConfig,
    previous: &'a PreviousHistories,
}

impl<'a> HistoryCollector<'a> {
    /// Creates a collector that continues the histories in `previous`.
    pub fn new(config: &'a StabilityConfig, previous: &'a PreviousHistories) -> Self {
        Self { config, previous }
    }

    /// Builds the history tree for the run `run_id`, whose results are in
    /// `report`.
    ///
    /// Every unit's history is copied from the previous run (or started
    /// fresh), and the run's outcome is appended to it unless the unit was
    /// skipped. Children named in the config's exclude list are then removed
    /// from every aggregate.
    pub fn collect(&self, run_id: RunId, report: &Report) -> CollectedHistories {
        let mut state = CollectState {
            collector: *self,
            run_id,
            tree: HistoryTree::new(),
            units: IndexMap::new(),
        };

        let report_name = report.name.as_str();
        let root_outcome = UnitOutcome::aggregate(
            report
                .test_suites
                .iter()
                .flat_map(|suite| &suite.test_cases)
                .map(UnitOutcome::for_test_case),
        );
        let root = state.add_unit(report_name.to_owned(), report_name, root_outcome, false);

        for suite in &report.test_suites {
            let suite_name = suite.name.as_str();
            let suite_id = format!("{report_name}/{suite_name}");

            // Group test cases by class, in order of first appearance.
            let mut classes: IndexMap<&str, Vec<&TestCase>> = IndexMap::new();
            for test_case in &suite.test_cases {
                let class_name = test_case
                    .classname
                    .as_ref()
                    .map_or(suite_name, |classname| classname.as_str());
                classes.entry(class_name).or_default().push(test_case);
            }

            let suite_outcome =
                UnitOutcome::aggregate(suite.test_cases.iter().map(UnitOutcome::for_test_case));
            let suite_node = state.add_unit(suite_id.clone(), suite_name, suite_outcome, false);
            state.attach(root, suite_node);

            for (class_name, test_cases) in classes {
                let class_id = format!("{suite_id}/{class_name}");
                let class_outcome = UnitOutcome::aggregate(
                    test_cases.iter().map(|test_case| UnitOutcome::for_test_case(test_case)),
                );
                let class_node = state.add_unit(class_id.clone(), class_name, class_outcome, false);
                state.attach(suite_node, class_node);

                for test_case in test_cases {
                    let case_name = test_case.name.as_str();
                    let case_node = state.add_unit(
                        format!("{class_id}/{case_name}"),
                        case_name,
                        UnitOutcome::for_test_case(test_case),
                        true,
                    );
                    state.attach(class_node, case_node);
                }
            }
        }

        state.finish(root)
    }
}

struct CollectState<'a> {
    collector: HistoryCollector<'a>,
    run_id: RunId,
    tree: HistoryTree,
    units: IndexMap<String, NodeId>,
}

impl CollectState<'_> {
    fn add_unit(
        &mut self,
        unit_id: String,
        name: &str,
        outcome: UnitOutcome,
        should_publish: bool,
    ) -> NodeId {
        let capacity = self.collector.config.max_history_length();
        let mut node = match self.collector.previous.get(&unit_id) {
            Some(previous) => HistoryNode::cloned_from(previous, capacity),
            None => {
                debug!("no previous history for {unit_id}, starting a new one");
                HistoryNode::new(capacity)
            }
        };

        match outcome.to_record(self.run_id) {
            Some(record) => {
                node.add(record);
            }
            None => trace!("{unit_id} was skipped in run {}", self.run_id),
        }
        node.set_name(name).set_should_publish(should_publish);

        let id = self.tree.insert(node);
        if let Some(previous_id) = self.units.insert(unit_id, id) {
            debug!(
                "unit ID for node {id} duplicates node {previous_id}; \
                 only the later one is kept for the next run",
            );
        }
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        // Nodes are freshly inserted and attached exactly once, top-down.
        if let Err(err) = self.tree.attach_child(parent, child) {
            debug!("not attaching node {child}: {err}");
        }
    }

    fn finish(mut self, root: NodeId) -> CollectedHistories {
        let config = self.collector.config;
        if !config.exclude().is_empty() {
            let aggregates: Vec<NodeId> = self
                .tree
                .iter()
                .filter(|(_, node)| !node.children().is_empty())
                .map(|(id, _)| id)
                .collect();
            for aggregate in aggregates {
                for name in config.exclude() {
                    self.tree.remove_child(aggregate, name);
                }
            }

            let tree = &self.tree;
            self.units.retain(|_, &mut id| {
                id == root || tree.ancestors(id).last() == Some(root)
            });
        }

        debug!(
            "collected {} unit histories for run {}",
            self.units.len(),
            self.run_id,
        );
        CollectedHistories {
            tree: self.tree,
            root,
            units: self.units,
        }
    }
}

/// The history tree built for one run.
#[derive(Clone, Debug)]
pub struct CollectedHistories {
    tree: HistoryTree,
    root: NodeId,
    units: IndexMap<String, NodeId>,
}

impl CollectedHistories {
    /// Returns the tree.
    pub fn tree(&self) -> &HistoryTree {
        &self.tree
    }

    /// Returns the node for the report itself.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node for a unit ID, if the unit is part of the tree.
    pub fn get(&self, unit_id: &str) -> Option<NodeId> {
        self.units.get(unit_id).copied()
    }

    /// Iterates over unit IDs and their nodes, parents before children.
    pub fn units(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.units
            .iter()
            .map(|(unit_id, &id)| (unit_id.as_str(), id))
    }

    /// Returns the histories to carry over into the next run.
    pub fn snapshot(&self) -> PreviousHistories {
        let mut histories = PreviousHistories::new();
        for (unit_id, id) in self.units() {
            histories.insert(unit_id, self.tree[id].buffer().clone());
        }
        histories
    }
}
