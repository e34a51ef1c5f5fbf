// Copyright (c) The quick-nunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, FixedOffset, TimeZone};
use nunit_aggregator::{CaseEvent, Outcome, Phase, RunAggregator, RunConfig};
use pretty_assertions::assert_eq;
use proptest::{prelude::*, test_runner::TestCaseError};
use quick_nunit::{
    parse_report, Failure, FailureSite, FilterField, Filter, SuiteType, TestResult, TestRun,
    TestSuite,
};
use std::{collections::HashSet, time::Duration};

fn timestamp(sec: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .expect("offset is in range")
        .with_ymd_and_hms(2024, 3, 1, 10, 0, sec)
        .single()
        .expect("timestamp is unambiguous")
}

fn call(test_id: &str, outcome: Outcome) -> CaseEvent {
    CaseEvent::new(test_id, test_id, ["pkg", "fixture"], Phase::Call, outcome)
}

/// Checks that at every level of the tree the total equals both the sum of
/// the result buckets and the sum of the direct children's totals.
fn assert_counters_consistent(run: &TestRun) {
    assert_eq!(
        run.total,
        run.passed + run.failed + run.warnings + run.inconclusive + run.skipped,
        "run buckets must sum to total"
    );
    assert_eq!(
        run.total,
        run.suites.iter().map(|suite| suite.total).sum::<usize>(),
        "run total must equal the sum of suite totals"
    );
    for suite in &run.suites {
        assert_suite_counters_consistent(suite);
    }
}

fn assert_suite_counters_consistent(suite: &TestSuite) {
    assert_eq!(
        suite.total,
        suite.passed + suite.failed + suite.warnings + suite.inconclusive + suite.skipped,
        "suite `{}` buckets must sum to total",
        suite.fullname
    );
    let children: usize = suite.suites.iter().map(|child| child.total).sum::<usize>()
        + suite.cases.len();
    assert_eq!(
        suite.total, children,
        "suite `{}` total must equal its children",
        suite.fullname
    );
    for child in &suite.suites {
        assert_suite_counters_consistent(child);
    }
}

#[test]
fn single_passing_test() {
    let mut agg = RunAggregator::new(RunConfig::new("session"));
    let mut event = call("0-1", Outcome::Passed);
    event
        .set_timestamp(timestamp(0))
        .set_duration(Duration::from_millis(250))
        .set_asserts(2)
        .set_output("hello from the test");
    agg.ingest(event);
    let run = agg.finish();

    assert_eq!(run.total, 1);
    assert_eq!(run.passed, 1);
    assert_eq!(run.result, TestResult::Passed);
    assert_eq!(run.asserts, 2);
    assert_eq!(run.duration, Some(Duration::from_millis(250)));
    assert_counters_consistent(&run);

    let fixture = &run.suites[0].suites[0];
    assert_eq!(fixture.fullname, "pkg.fixture");
    assert_eq!(fixture.result, TestResult::Passed);
    let case = &fixture.cases[0];
    assert_eq!(case.fullname, "pkg.fixture.0-1");
    assert_eq!(case.output.as_ref().map(|o| o.as_str()), Some("hello from the test"));
}

#[test]
fn single_failing_test() {
    let mut agg = RunAggregator::new(RunConfig::new("session"));
    let mut event = call("0-1", Outcome::Failed);
    let mut failure = Failure::new("left != right");
    failure.set_stack_trace("tests/math.rs:12");
    event.set_failure(failure);
    agg.ingest(event);
    let run = agg.finish();

    assert_eq!(run.total, 1);
    assert_eq!(run.failed, 1);
    assert_eq!(run.result, TestResult::Failed);
    assert_counters_consistent(&run);

    let case = &run.suites[0].suites[0].cases[0];
    assert_eq!(case.site, Some(FailureSite::Test));
    assert_eq!(
        case.failure.as_ref().and_then(|f| f.stack_trace.as_deref()),
        Some("tests/math.rs:12")
    );
}

#[test]
fn single_skipped_test() {
    let mut agg = RunAggregator::new(RunConfig::new("session"));
    let mut event = call("0-1", Outcome::Skipped);
    event.set_reason("requires linux");
    agg.ingest(event);
    let run = agg.finish();

    assert_eq!(run.total, 1);
    assert_eq!(run.skipped, 1);
    assert_eq!(run.result, TestResult::Skipped);
    assert_counters_consistent(&run);
    assert_eq!(
        run.suites[0].suites[0].cases[0].reason.as_deref(),
        Some("requires linux")
    );
}

#[test]
fn mixed_outcomes_roll_up_to_failed() {
    let mut agg = RunAggregator::new(RunConfig::new("session"));
    agg.ingest(call("0-1", Outcome::Passed));
    let mut failed = call("0-2", Outcome::Failed);
    failed.set_failure(Failure::new("assertion failed"));
    agg.ingest(failed);
    let mut skipped = call("0-3", Outcome::Skipped);
    skipped.set_reason("requires network");
    agg.ingest(skipped);
    let run = agg.finish();

    assert_eq!(run.total, 3);
    assert_eq!(run.passed, 1);
    assert_eq!(run.failed, 1);
    assert_eq!(run.skipped, 1);
    assert_eq!(run.result, TestResult::Failed);
    assert_counters_consistent(&run);

    let fixture = &run.suites[0].suites[0];
    assert_eq!(fixture.result, TestResult::Failed);
    assert_eq!(run.suites[0].result, TestResult::Failed);
}

#[test]
fn setup_failure_is_counted_once_with_setup_site() {
    let mut agg = RunAggregator::new(RunConfig::new("session"));
    let mut setup = CaseEvent::new("0-1", "0-1", ["pkg", "fixture"], Phase::Setup, Outcome::Failed);
    setup.set_failure(Failure::new("fixture could not start"));
    agg.ingest(setup);
    agg.ingest(call("0-1", Outcome::Passed));
    agg.ingest(CaseEvent::new(
        "0-1",
        "0-1",
        ["pkg", "fixture"],
        Phase::Teardown,
        Outcome::Passed,
    ));
    let run = agg.finish();

    assert_eq!(run.total, 1);
    assert_eq!(run.failed, 1);
    assert_counters_consistent(&run);

    let case = &run.suites[0].suites[0].cases[0];
    assert_eq!(case.result, TestResult::Failed);
    assert_eq!(case.site, Some(FailureSite::SetUp));
    assert_eq!(
        case.failure.as_ref().and_then(|f| f.message.as_deref()),
        Some("fixture could not start")
    );
}

#[test]
fn error_outcome_lands_in_failed_bucket() {
    let mut agg = RunAggregator::new(RunConfig::new("session"));
    agg.ingest(call("0-1", Outcome::Error));
    let run = agg.finish();

    assert_eq!(run.failed, 1);
    assert_eq!(run.passed, 0);
    let case = &run.suites[0].suites[0].cases[0];
    assert_eq!(case.result, TestResult::Failed);
    assert_eq!(case.label.as_deref(), Some("Error"));
}

#[test]
fn empty_run_is_inconclusive() {
    let run = RunAggregator::new(RunConfig::new("session")).finish();

    assert_eq!(run.total, 0);
    assert_eq!(run.result, TestResult::Inconclusive);
    assert!(run.suites.is_empty());
    assert_eq!(run.duration, None);
}

#[test]
fn aggregated_run_round_trips_through_xml() {
    let mut config = RunConfig::new("session");
    config
        .set_command_line("pytest -k listener")
        .set_filter(Filter::matching(FilterField::Name, "listener"))
        .set_random_seed(99);
    let mut agg = RunAggregator::new(config);

    let mut passed = call("0-1", Outcome::Passed);
    passed
        .set_timestamp(timestamp(0))
        .set_duration(Duration::from_millis(500))
        .set_asserts(4)
        .set_output("bound port 8080");
    agg.ingest(passed);

    let mut failed = CaseEvent::new("0-2", "0-2", ["pkg", "other"], Phase::Call, Outcome::Failed);
    failed
        .set_timestamp(timestamp(1))
        .set_duration(Duration::from_millis(250));
    let mut failure = Failure::new("boom");
    failure.set_stack_trace("tests/other.rs:7");
    failed.set_failure(failure);
    agg.ingest(failed);

    let mut skipped = call("0-3", Outcome::Skipped);
    skipped.set_reason("no ipv6");
    agg.ingest(skipped);

    let run = agg.finish();
    assert_counters_consistent(&run);

    let xml = run.to_string().expect("serializing the run succeeds");
    let parsed = parse_report(&xml).expect("parsing the run succeeds");
    assert_eq!(parsed, run);
}

#[test]
fn suites_nest_by_path_with_assembly_root() {
    let mut agg = RunAggregator::new(RunConfig::new("session"));
    agg.ingest(CaseEvent::new(
        "0-1",
        "deep",
        ["root", "inner", "fixture"],
        Phase::Call,
        Outcome::Passed,
    ));
    agg.ingest(CaseEvent::new(
        "0-2",
        "shallow",
        ["root"],
        Phase::Call,
        Outcome::Passed,
    ));
    let run = agg.finish();
    assert_counters_consistent(&run);

    assert_eq!(run.suites.len(), 1);
    let root = &run.suites[0];
    assert_eq!(root.suite_type, SuiteType::Assembly);
    assert_eq!(root.total, 2);
    assert_eq!(root.cases.len(), 1);
    assert_eq!(root.suites[0].suites[0].suite_type, SuiteType::TestFixture);
}

fn arb_event() -> impl Strategy<Value = CaseEvent> {
    let phase = prop_oneof![
        Just(Phase::Setup),
        Just(Phase::Call),
        Just(Phase::Teardown),
    ];
    let outcome = prop_oneof![
        Just(Outcome::Passed),
        Just(Outcome::Failed),
        Just(Outcome::Skipped),
        Just(Outcome::Error),
    ];
    (0usize..4, 0usize..3, phase, outcome, 0u64..5_000, 0usize..10).prop_map(
        |(id, path, phase, outcome, millis, asserts)| {
            let paths: [&[&str]; 3] = [&["a"], &["a", "b"], &["c"]];
            let mut event = CaseEvent::new(
                format!("t{id}"),
                format!("t{id}"),
                paths[path].iter().copied(),
                phase,
                outcome,
            );
            event
                .set_duration(Duration::from_millis(millis))
                .set_asserts(asserts);
            event
        },
    )
}

proptest! {
    /// Counter sums hold for any event stream, including streams with
    /// conflicting placements, retries and replays.
    #[test]
    fn counters_are_consistent_for_any_stream(
        events in proptest::collection::vec(arb_event(), 0..40),
    ) {
        let mut ids = HashSet::new();
        let mut agg = RunAggregator::new(RunConfig::new("prop-session"));
        for event in events {
            ids.insert(event.test_id.clone());
            agg.ingest(event);
        }
        let run = agg.finish();

        prop_assert!(run.total <= ids.len());
        prop_assert_eq!(
            run.total,
            run.passed + run.failed + run.warnings + run.inconclusive + run.skipped
        );
        let suite_sum: usize = run.suites.iter().map(|suite| suite.total).sum();
        prop_assert_eq!(run.total, suite_sum);
        for suite in &run.suites {
            prop_check_suite(suite)?;
        }
    }
}

fn prop_check_suite(suite: &TestSuite) -> Result<(), TestCaseError> {
    prop_assert_eq!(
        suite.total,
        suite.passed + suite.failed + suite.warnings + suite.inconclusive + suite.skipped
    );
    let children: usize = suite.suites.iter().map(|child| child.total).sum::<usize>()
        + suite.cases.len();
    prop_assert_eq!(suite.total, children);
    for child in &suite.suites {
        prop_check_suite(child)?;
    }
    Ok(())
}
