// Copyright (c) The quick-nunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event-to-report aggregation state machine.

use crate::{AggregatorIssue, CaseEvent, Outcome, Phase, RetryPolicy, RunConfig};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use quick_nunit::{
    Failure, FailureSite, RunState, SuiteType, TestCase, TestResult, TestRun, TestSuite,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Accumulates lifecycle events for one test session.
///
/// Suites and cases are created lazily on the first event referencing their
/// identity and never removed. The aggregator keeps a flat registry keyed by
/// suite path and test id; the nested report tree is assembled once, in
/// [`finish`](Self::finish).
///
/// All application is synchronous and single-threaded: the host drives the
/// aggregator one event at a time. Hosts that run tests on multiple worker
/// threads must serialize calls to [`ingest`](Self::ingest) behind a mutex.
#[derive(Clone, Debug)]
pub struct RunAggregator {
    config: RunConfig,
    suites: IndexMap<String, SuiteNode>,
    cases: IndexMap<String, CaseState>,
    issues: Vec<AggregatorIssue>,
}

impl RunAggregator {
    /// Creates a new aggregator for one session.
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            suites: IndexMap::new(),
            cases: IndexMap::new(),
            issues: Vec::new(),
        }
    }

    /// Applies one lifecycle event.
    ///
    /// Never fails: identity conflicts are recorded as issues and the event
    /// in conflict is dropped, so report generation cannot disturb the
    /// host's own run.
    pub fn ingest(&mut self, event: CaseEvent) {
        let suite_key = if event.suite_path.is_empty() {
            self.config.name.clone()
        } else {
            event.suite_path.join(".")
        };

        if let Some(existing) = self.cases.get(&event.test_id) {
            if existing.suite_key != suite_key {
                warn!(
                    test_id = %event.test_id,
                    first = %existing.suite_key,
                    second = %suite_key,
                    "test reported under conflicting suites; keeping first placement"
                );
                self.issues.push(AggregatorIssue::DuplicateIdentity {
                    test_id: event.test_id.clone(),
                    first_path: existing.suite_key.clone(),
                    second_path: suite_key,
                });
                return;
            }
        } else {
            if event.suite_path.is_empty() {
                let root = [self.config.name.clone()];
                self.ensure_suite_chain(&root);
            } else {
                self.ensure_suite_chain(&event.suite_path);
            }
            self.cases.insert(
                event.test_id.clone(),
                CaseState::new(event.name.clone(), suite_key),
            );
        }

        let policy = self.config.retry_policy;
        if let Some(state) = self.cases.get_mut(&event.test_id) {
            state.apply(&event, policy);
        }
    }

    /// Returns the non-fatal issues recorded so far.
    pub fn issues(&self) -> &[AggregatorIssue] {
        &self.issues
    }

    /// Seals the session and produces the report tree.
    ///
    /// Counters are derived here from the case registry, one occurrence per
    /// test id, and suite results are computed as a pure roll-up over
    /// children; replayed or duplicated events can therefore never
    /// double-count. Consuming `self` makes this callable exactly once.
    pub fn finish(self) -> TestRun {
        let RunAggregator {
            config,
            suites,
            cases,
            issues: _,
        } = self;

        // Cases grouped by owning suite, preserving first-seen order.
        let mut suite_cases: IndexMap<String, Vec<TestCase>> = IndexMap::new();
        for (test_id, state) in cases {
            let suite_key = state.suite_key.clone();
            suite_cases
                .entry(suite_key)
                .or_default()
                .push(state.into_test_case(test_id));
        }

        // Parent-to-children edges, preserving first-seen order. Ancestors
        // are always inserted before their descendants.
        let mut roots: Vec<String> = vec![];
        let mut children: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, node) in &suites {
            match &node.parent {
                Some(parent) => children
                    .entry(parent.clone())
                    .or_default()
                    .push(key.clone()),
                None => roots.push(key.clone()),
            }
        }

        let mut builder = SuiteTreeBuilder {
            suites: &suites,
            children,
            suite_cases,
            next_id: 0,
        };

        let mut run = TestRun::new(config.name);
        if let Some(command_line) = config.command_line {
            run.set_command_line(command_line);
        }
        if let Some(filter) = config.filter {
            run.set_filter(filter);
        }
        if let Some(seed) = config.random_seed {
            run.set_random_seed(seed);
        }

        for root in roots {
            let suite = builder.build(&root, 0);
            run.add_suite(suite);
        }
        run.result = run.roll_up_result();

        let mut start_time = None;
        let mut end_time = None;
        let mut duration = None;
        for suite in &run.suites {
            fold_timing(
                &mut start_time,
                &mut end_time,
                &mut duration,
                suite.start_time,
                suite.end_time,
                suite.duration,
            );
        }
        run.start_time = start_time;
        run.end_time = end_time;
        run.duration = duration;

        run
    }

    /// Registers every suite along a path of ancestor names, outermost
    /// first, so parents always precede children in the registry.
    fn ensure_suite_chain(&mut self, path: &[String]) {
        let mut fullname = String::new();
        let mut parent: Option<String> = None;
        for name in path {
            if fullname.is_empty() {
                fullname.clone_from(name);
            } else {
                fullname = format!("{fullname}.{name}");
            }
            if !self.suites.contains_key(&fullname) {
                debug!(suite = %fullname, "creating suite");
                self.suites.insert(
                    fullname.clone(),
                    SuiteNode {
                        name: name.clone(),
                        parent: parent.clone(),
                    },
                );
            }
            parent = Some(fullname.clone());
        }
    }
}

/// A suite registered during ingestion; identity is the dotted path.
#[derive(Clone, Debug)]
struct SuiteNode {
    name: String,
    parent: Option<String>,
}

/// The mutable per-test record. Exactly one exists per test id.
#[derive(Clone, Debug)]
struct CaseState {
    name: String,
    suite_key: String,
    result: Option<TestResult>,
    site: Option<FailureSite>,
    label: Option<String>,
    terminal: bool,
    phase_durations: [Option<Duration>; 3],
    phase_asserts: [Option<usize>; 3],
    phase_output: [Option<String>; 3],
    start_time: Option<DateTime<FixedOffset>>,
    end_time: Option<DateTime<FixedOffset>>,
    failure: Option<Failure>,
    reason: Option<String>,
}

impl CaseState {
    fn new(name: String, suite_key: String) -> Self {
        Self {
            name,
            suite_key,
            result: None,
            site: None,
            label: None,
            terminal: false,
            phase_durations: [None, None, None],
            phase_asserts: [None, None, None],
            phase_output: [None, None, None],
            start_time: None,
            end_time: None,
            failure: None,
            reason: None,
        }
    }

    fn apply(&mut self, event: &CaseEvent, policy: RetryPolicy) {
        // Skips short-circuit all further phase processing for the case.
        if self.result == Some(TestResult::Skipped) {
            debug!(test = %self.name, "ignoring event after skip");
            return;
        }
        if self.terminal && policy == RetryPolicy::FirstTerminalWins {
            debug!(test = %self.name, "ignoring event after terminal result");
            return;
        }

        // Per-phase slots make replays of the same event no-ops.
        let phase = event.phase as usize;
        self.phase_durations[phase] = Some(event.duration);
        self.phase_asserts[phase] = Some(event.asserts);
        if let Some(output) = &event.output {
            self.phase_output[phase] = Some(output.clone());
        }
        if let Some(ts) = event.timestamp {
            self.start_time = Some(self.start_time.map_or(ts, |cur| cur.min(ts)));
            let end = chrono::Duration::from_std(event.duration)
                .ok()
                .and_then(|delta| ts.checked_add_signed(delta))
                .unwrap_or(ts);
            self.end_time = Some(self.end_time.map_or(end, |cur| cur.max(end)));
        }
        if let Some(failure) = &event.failure {
            self.failure = Some(failure.clone());
        }

        match (event.phase, event.outcome) {
            (_, Outcome::Skipped) => {
                self.result = Some(TestResult::Skipped);
                self.site = None;
                self.label = None;
                if let Some(reason) = &event.reason {
                    self.reason = Some(reason.clone());
                }
                self.terminal = true;
            }
            (Phase::Setup, Outcome::Failed | Outcome::Error) => {
                self.fail(FailureSite::SetUp, event.outcome);
            }
            (Phase::Teardown, Outcome::Failed | Outcome::Error) => {
                self.fail(FailureSite::TearDown, event.outcome);
            }
            (Phase::Call, Outcome::Failed | Outcome::Error) => {
                // A fixture failure masks the body's own outcome.
                if !self.masked_by_fixture() {
                    self.fail(FailureSite::Test, event.outcome);
                } else {
                    self.terminal = true;
                }
            }
            (Phase::Call, Outcome::Passed) => {
                if !self.masked_by_fixture() {
                    self.result = Some(TestResult::Passed);
                    self.site = None;
                    self.label = None;
                }
                self.terminal = true;
            }
            (Phase::Setup, Outcome::Passed) => {
                // A clean setup begins a fresh attempt: clear a stale
                // fixture mask, from either setup or teardown of the
                // previous attempt, so the new attempt's outcome can land.
                if self.masked_by_fixture() {
                    self.result = None;
                    self.site = None;
                    self.label = None;
                    self.terminal = false;
                }
            }
            (Phase::Teardown, Outcome::Passed) => {}
        }
    }

    fn fail(&mut self, site: FailureSite, outcome: Outcome) {
        self.result = Some(TestResult::Failed);
        self.site = Some(site);
        self.label = (outcome == Outcome::Error).then(|| "Error".to_owned());
        self.terminal = true;
    }

    fn masked_by_fixture(&self) -> bool {
        matches!(
            self.site,
            Some(FailureSite::SetUp) | Some(FailureSite::TearDown)
        )
    }

    fn into_test_case(self, test_id: String) -> TestCase {
        let CaseState {
            name,
            suite_key,
            result,
            site,
            label,
            terminal: _,
            phase_durations,
            phase_asserts,
            phase_output,
            start_time,
            end_time,
            failure,
            reason,
        } = self;

        let fullname = format!("{suite_key}.{name}");
        let methodname = name.clone();
        let mut case = TestCase::new(test_id, name);
        case.set_fullname(fullname)
            .set_classname(suite_key)
            .set_methodname(methodname);

        let result = result.unwrap_or(TestResult::Inconclusive);
        case.result = result;
        case.site = site;
        case.label = label;
        case.run_state = if result == TestResult::Skipped {
            RunState::Ignored
        } else {
            RunState::Runnable
        };

        let mut duration = None;
        for phase_duration in phase_durations.into_iter().flatten() {
            duration = Some(duration.unwrap_or(Duration::ZERO) + phase_duration);
        }
        case.duration = duration;
        case.asserts = phase_asserts.into_iter().flatten().sum();
        case.start_time = start_time;
        case.end_time = end_time;

        let output: Vec<String> = phase_output.into_iter().flatten().collect();
        if !output.is_empty() {
            case.set_output(output.join("\n"));
        }

        match result {
            TestResult::Failed => case.failure = failure,
            TestResult::Skipped => case.reason = reason,
            TestResult::Inconclusive => {
                case.reason =
                    Some(reason.unwrap_or_else(|| {
                        "test did not report a terminal result".to_owned()
                    }));
            }
            _ => {}
        }

        case
    }
}

/// Assembles the nested suite tree from the flat registries.
struct SuiteTreeBuilder<'a> {
    suites: &'a IndexMap<String, SuiteNode>,
    children: IndexMap<String, Vec<String>>,
    suite_cases: IndexMap<String, Vec<TestCase>>,
    next_id: usize,
}

impl SuiteTreeBuilder<'_> {
    fn build(&mut self, key: &str, depth: usize) -> TestSuite {
        let node = &self.suites[key];
        let mut suite = TestSuite::new(node.name.clone(), key.to_owned(), SuiteType::TestSuite);
        self.next_id += 1;
        suite.set_id(self.next_id.to_string());

        let child_keys = self.children.get(key).cloned().unwrap_or_default();
        for child_key in &child_keys {
            let child = self.build(child_key, depth + 1);
            suite.add_suite(child);
        }

        let cases = self.suite_cases.swap_remove(key).unwrap_or_default();
        let has_cases = !cases.is_empty();
        suite.add_test_cases(cases);

        suite.suite_type = if depth == 0 {
            SuiteType::Assembly
        } else if has_cases {
            SuiteType::TestFixture
        } else {
            SuiteType::TestSuite
        };

        // Suite duration is the sum of child durations; the start/end span
        // may exceed it when the host leaves gaps between tests.
        let mut start_time = None;
        let mut end_time = None;
        let mut duration = None;
        for child in &suite.suites {
            fold_timing(
                &mut start_time,
                &mut end_time,
                &mut duration,
                child.start_time,
                child.end_time,
                child.duration,
            );
        }
        for case in &suite.cases {
            fold_timing(
                &mut start_time,
                &mut end_time,
                &mut duration,
                case.start_time,
                case.end_time,
                case.duration,
            );
        }
        suite.start_time = start_time;
        suite.end_time = end_time;
        suite.duration = duration;

        suite.result = suite.roll_up_result();
        suite
    }
}

fn fold_timing(
    start_time: &mut Option<DateTime<FixedOffset>>,
    end_time: &mut Option<DateTime<FixedOffset>>,
    duration: &mut Option<Duration>,
    child_start: Option<DateTime<FixedOffset>>,
    child_end: Option<DateTime<FixedOffset>>,
    child_duration: Option<Duration>,
) {
    if let Some(start) = child_start {
        *start_time = Some(start_time.map_or(start, |cur| cur.min(start)));
    }
    if let Some(end) = child_end {
        *end_time = Some(end_time.map_or(end, |cur| cur.max(end)));
    }
    if let Some(d) = child_duration {
        *duration = Some(duration.unwrap_or(Duration::ZERO) + d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CaseEvent, Outcome, Phase, RetryPolicy, RunConfig};
    use pretty_assertions::assert_eq;

    fn event(test_id: &str, phase: Phase, outcome: Outcome) -> CaseEvent {
        CaseEvent::new(test_id, test_id, ["pkg", "mod"], phase, outcome)
    }

    fn only_case(run: &TestRun) -> &TestCase {
        &run.suites[0].suites[0].cases[0]
    }

    #[test]
    fn setup_failure_masks_call_outcome() {
        let mut agg = RunAggregator::new(RunConfig::new("run"));
        agg.ingest(event("t", Phase::Setup, Outcome::Error));
        agg.ingest(event("t", Phase::Call, Outcome::Passed));
        let run = agg.finish();

        let case = only_case(&run);
        assert_eq!(case.result, TestResult::Failed);
        assert_eq!(case.site, Some(FailureSite::SetUp));
        assert_eq!(case.label.as_deref(), Some("Error"));
        assert_eq!(run.total, 1);
        assert_eq!(run.failed, 1);
    }

    #[test]
    fn teardown_failure_overrides_call_pass() {
        let mut agg = RunAggregator::new(RunConfig::new("run"));
        agg.ingest(event("t", Phase::Call, Outcome::Passed));
        agg.ingest(event("t", Phase::Teardown, Outcome::Failed));
        let run = agg.finish();

        let case = only_case(&run);
        assert_eq!(case.result, TestResult::Failed);
        assert_eq!(case.site, Some(FailureSite::TearDown));
        assert_eq!(case.label, None);
    }

    #[test]
    fn skip_short_circuits_later_phases() {
        let mut agg = RunAggregator::new(RunConfig::new("run"));
        let mut skip = event("t", Phase::Setup, Outcome::Skipped);
        skip.set_reason("not supported here");
        agg.ingest(skip);
        agg.ingest(event("t", Phase::Call, Outcome::Passed));
        let run = agg.finish();

        let case = only_case(&run);
        assert_eq!(case.result, TestResult::Skipped);
        assert_eq!(case.run_state, RunState::Ignored);
        assert_eq!(case.reason.as_deref(), Some("not supported here"));
        assert_eq!(run.skipped, 1);
        assert_eq!(run.passed, 0);
    }

    #[test]
    fn duplicate_identity_keeps_first_placement() {
        let mut agg = RunAggregator::new(RunConfig::new("run"));
        agg.ingest(event("t", Phase::Call, Outcome::Passed));
        let mut conflicting = event("t", Phase::Call, Outcome::Failed);
        conflicting.suite_path = vec!["other".to_owned()];
        agg.ingest(conflicting);

        assert_eq!(
            agg.issues(),
            &[AggregatorIssue::DuplicateIdentity {
                test_id: "t".to_owned(),
                first_path: "pkg.mod".to_owned(),
                second_path: "other".to_owned(),
            }]
        );

        let run = agg.finish();
        assert_eq!(run.total, 1);
        assert_eq!(run.passed, 1);
        assert_eq!(run.failed, 0);
        let case = only_case(&run);
        assert_eq!(case.classname.as_deref(), Some("pkg.mod"));
    }

    #[test]
    fn retry_last_outcome_wins() {
        let mut agg = RunAggregator::new(RunConfig::new("run"));
        agg.ingest(event("t", Phase::Call, Outcome::Failed));
        agg.ingest(event("t", Phase::Call, Outcome::Passed));
        let run = agg.finish();

        assert_eq!(only_case(&run).result, TestResult::Passed);
        assert_eq!(run.passed, 1);
        assert_eq!(run.failed, 0);
    }

    #[test]
    fn retry_after_setup_failure_can_recover() {
        let mut agg = RunAggregator::new(RunConfig::new("run"));
        agg.ingest(event("t", Phase::Setup, Outcome::Error));
        agg.ingest(event("t", Phase::Setup, Outcome::Passed));
        agg.ingest(event("t", Phase::Call, Outcome::Passed));
        let run = agg.finish();

        let case = only_case(&run);
        assert_eq!(case.result, TestResult::Passed);
        assert_eq!(case.site, None);
    }

    #[test]
    fn retry_after_teardown_failure_can_recover() {
        let mut agg = RunAggregator::new(RunConfig::new("run"));
        agg.ingest(event("t", Phase::Call, Outcome::Passed));
        agg.ingest(event("t", Phase::Teardown, Outcome::Failed));
        agg.ingest(event("t", Phase::Setup, Outcome::Passed));
        agg.ingest(event("t", Phase::Call, Outcome::Passed));
        agg.ingest(event("t", Phase::Teardown, Outcome::Passed));
        let run = agg.finish();

        let case = only_case(&run);
        assert_eq!(case.result, TestResult::Passed);
        assert_eq!(case.site, None);
        assert_eq!(run.passed, 1);
        assert_eq!(run.failed, 0);
    }

    #[test]
    fn retry_first_terminal_wins() {
        let mut config = RunConfig::new("run");
        config.set_retry_policy(RetryPolicy::FirstTerminalWins);
        let mut agg = RunAggregator::new(config);
        agg.ingest(event("t", Phase::Call, Outcome::Failed));
        agg.ingest(event("t", Phase::Call, Outcome::Passed));
        let run = agg.finish();

        assert_eq!(only_case(&run).result, TestResult::Failed);
        assert_eq!(run.failed, 1);
        assert_eq!(run.passed, 0);
    }

    #[test]
    fn replayed_terminal_event_counts_once() {
        let mut agg = RunAggregator::new(RunConfig::new("run"));
        let passed = event("t", Phase::Call, Outcome::Passed);
        agg.ingest(passed.clone());
        agg.ingest(passed);
        let run = agg.finish();

        assert_eq!(run.total, 1);
        assert_eq!(run.passed, 1);
    }

    #[test]
    fn unterminated_case_is_inconclusive() {
        let mut agg = RunAggregator::new(RunConfig::new("run"));
        agg.ingest(event("t", Phase::Setup, Outcome::Passed));
        let run = agg.finish();

        let case = only_case(&run);
        assert_eq!(case.result, TestResult::Inconclusive);
        assert_eq!(
            case.reason.as_deref(),
            Some("test did not report a terminal result")
        );
        assert_eq!(run.inconclusive, 1);
    }

    #[test]
    fn empty_path_uses_synthetic_root_suite() {
        let mut agg = RunAggregator::new(RunConfig::new("pytest"));
        agg.ingest(CaseEvent::new(
            "t",
            "t",
            Vec::<String>::new(),
            Phase::Call,
            Outcome::Passed,
        ));
        let run = agg.finish();

        assert_eq!(run.suites.len(), 1);
        assert_eq!(run.suites[0].name, "pytest");
        assert_eq!(run.suites[0].suite_type, SuiteType::Assembly);
        assert_eq!(run.suites[0].cases.len(), 1);
    }

    #[test]
    fn suite_types_follow_nesting() {
        let mut agg = RunAggregator::new(RunConfig::new("run"));
        agg.ingest(CaseEvent::new(
            "t",
            "t",
            ["assembly", "middle", "fixture"],
            Phase::Call,
            Outcome::Passed,
        ));
        let run = agg.finish();

        let assembly = &run.suites[0];
        assert_eq!(assembly.suite_type, SuiteType::Assembly);
        let middle = &assembly.suites[0];
        assert_eq!(middle.suite_type, SuiteType::TestSuite);
        let fixture = &middle.suites[0];
        assert_eq!(fixture.suite_type, SuiteType::TestFixture);
        assert_eq!(fixture.fullname, "assembly.middle.fixture");
    }
}
