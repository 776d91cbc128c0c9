// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};

/// The outcome of a fixture test case in one run.
#[derive(Clone, Copy, Debug)]
pub(crate) enum CaseStatus {
    Pass,
    Fail,
    Skip,
}

impl CaseStatus {
    fn to_junit(self) -> TestCaseStatus {
        match self {
            Self::Pass => TestCaseStatus::success(),
            Self::Fail => TestCaseStatus::non_success(NonSuccessKind::Failure),
            Self::Skip => TestCaseStatus::skipped(),
        }
    }
}

/// Builds a report with a single suite, `my-suite`, containing the cases
/// `(classname, name, status)`.
pub(crate) fn make_report(cases: &[(&str, &str, CaseStatus)]) -> Report {
    let mut suite = TestSuite::new("my-suite");
    for &(classname, name, status) in cases {
        let mut test_case = TestCase::new(name, status.to_junit());
        test_case.set_classname(classname);
        suite.add_test_case(test_case);
    }

    let mut report = Report::new("nextest-run");
    report.add_test_suite(suite);
    report
}
