// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::{CaseStatus, make_report};
use color_eyre::eyre::{Result, eyre};
use indoc::indoc;
use pretty_assertions::assert_eq;
use stability_history::{
    HistoryCollector, OutcomeRecord, PreviousHistories, StabilityConfig,
    report::{NodeSummary, RegressionReport, Styles, TransitionStatus, transitions},
};

const PARSER_OK: &str = "nextest-run/my-suite/parser/parses_ok";
const PARSER_ERR: &str = "nextest-run/my-suite/parser/rejects_garbage";
const NETWORK: &str = "nextest-run/my-suite/net/connects";

/// Runs the collector over successive reports, persisting histories as JSON
/// in between, and returns the final run's histories.
fn run_all(
    config: &StabilityConfig,
    runs: &[Vec<(&str, &str, CaseStatus)>],
) -> Result<stability_history::CollectedHistories> {
    let mut stored = serde_json::to_string(&PreviousHistories::new())?;
    let mut last = None;
    for (index, cases) in runs.iter().enumerate() {
        let previous: PreviousHistories = serde_json::from_str(&stored)?;
        let report = make_report(cases);
        let collected = HistoryCollector::new(config, &previous).collect(index as u64 + 1, &report);
        stored = serde_json::to_string(&collected.snapshot())?;
        last = Some(collected);
    }
    last.ok_or_else(|| eyre!("no runs"))
}

#[test]
fn histories_accumulate_across_runs() -> Result<()> {
    use CaseStatus::*;

    let config = StabilityConfig::from_toml_str("test", "max-history-length = 4")?;
    // (parses_ok, rejects_garbage, connects) for runs 1 to 5.
    let outcomes = [
        (Pass, Pass, Fail),
        (Pass, Fail, Pass),
        (Pass, Pass, Skip),
        (Pass, Pass, Fail),
        (Pass, Fail, Pass),
    ];
    let runs: Vec<_> = outcomes
        .into_iter()
        .map(|(ok, err, net)| {
            vec![
                ("parser", "parses_ok", ok),
                ("parser", "rejects_garbage", err),
                ("net", "connects", net),
            ]
        })
        .collect();
    let collected = run_all(&config, &runs)?;
    let tree = collected.tree();

    // Run 1 has been evicted from the four-run window.
    let parser_err = &tree[collected.get(PARSER_ERR).ok_or_else(|| eyre!("missing unit"))?];
    assert_eq!(
        parser_err.buffer().ordered(),
        vec![
            OutcomeRecord::fail(2),
            OutcomeRecord::pass(3),
            OutcomeRecord::pass(4),
            OutcomeRecord::fail(5),
        ]
    );
    assert_eq!(parser_err.stability(), 50);
    assert_eq!(parser_err.flakiness(), 66);
    assert!(parser_err.is_most_recent_regressed());

    // The skipped run left no record.
    let network = &tree[collected.get(NETWORK).ok_or_else(|| eyre!("missing unit"))?];
    assert_eq!(
        network.buffer().ordered(),
        vec![
            OutcomeRecord::fail(1),
            OutcomeRecord::pass(2),
            OutcomeRecord::fail(4),
            OutcomeRecord::pass(5),
        ]
    );
    let statuses: Vec<_> = transitions(network.buffer().iter())
        .into_iter()
        .map(|transition| transition.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            TransitionStatus::Fail,
            TransitionStatus::Fixed,
            TransitionStatus::Regression,
            TransitionStatus::Fixed,
        ]
    );

    let parser_ok = &tree[collected.get(PARSER_OK).ok_or_else(|| eyre!("missing unit"))?];
    assert!(parser_ok.buffer().all_passed());
    assert_eq!(parser_ok.flakiness(), 0);

    // The suite aggregates every case. Its window covers runs 2 to 5, and it
    // failed in runs 2, 4 and 5.
    let root = collected.root();
    let suite = collected
        .get("nextest-run/my-suite")
        .ok_or_else(|| eyre!("missing suite"))?;
    assert_eq!(tree[suite].failed_count(), 3);
    assert_eq!(tree.flakiest_child(root), Some(suite));

    // `net` is the flakiest class; within it, the only case.
    let net = collected
        .get("nextest-run/my-suite/net")
        .ok_or_else(|| eyre!("missing class"))?;
    assert_eq!(tree.flakiest_child(suite), Some(net));
    assert_eq!(
        tree.flakiest_descendant(root),
        collected.get(NETWORK),
        "greedy search reaches the flaky network test"
    );
    // Stability ties at 50% between the classes; the first class wins.
    let parser = collected
        .get("nextest-run/my-suite/parser")
        .ok_or_else(|| eyre!("missing class"))?;
    assert_eq!(tree.least_stable_descendant(suite), Some(parser));

    let summary = NodeSummary::new(tree, suite);
    assert_eq!(summary.flakiest_child_name(), "net");
    assert_eq!(summary.flakiest_child_flakiness(), 100);

    Ok(())
}

#[test]
fn regression_report_lists_publishable_units() -> Result<()> {
    use CaseStatus::*;

    let config = StabilityConfig::default();
    let collected = run_all(
        &config,
        &[
            vec![("parser", "parses_ok", Pass), ("parser", "rejects_garbage", Pass)],
            vec![("parser", "parses_ok", Fail), ("parser", "rejects_garbage", Pass)],
        ],
    )?;

    let mut report = RegressionReport::from_collected(&collected);
    report.set_author("ci-bot");

    // Aggregates regressed too, but only test cases are published.
    assert_eq!(
        report.display(&Styles::default()).to_string(),
        indoc! {"
            1 regression found. Author: ci-bot
              nextest-run/my-suite/parser/parses_ok Failed 1 times in the last 2 runs. Flakiness: 100%, Stability: 50%
        "}
    );
    Ok(())
}
