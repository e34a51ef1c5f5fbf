// Copyright (c) The quick-nunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle events reported by the host test runner.

use chrono::{DateTime, FixedOffset};
use quick_nunit::Failure;
use std::time::Duration;

/// The lifecycle phase an event belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    /// Fixture setup before the test body.
    Setup,

    /// The test body itself.
    Call,

    /// Fixture teardown after the test body.
    Teardown,
}

/// The host's classification of a phase outcome.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Outcome {
    /// The phase completed normally.
    Passed,

    /// The phase failed in an expected way (an assertion).
    Failed,

    /// The test was explicitly skipped.
    Skipped,

    /// The phase failed in an unexpected way (an exception outside the
    /// test's assertions, a broken fixture, an infrastructure problem).
    Error,
}

/// One lifecycle event for one test.
///
/// The host must supply a stable unique `test_id` and the same `suite_path`
/// for every event referencing the same test.
#[derive(Clone, Debug)]
pub struct CaseEvent {
    /// The stable unique id of the test.
    pub test_id: String,

    /// The display name of the test.
    pub name: String,

    /// The names of the ancestor suites, outermost first. An empty path
    /// places the test under a synthetic root suite named after the run.
    pub suite_path: Vec<String>,

    /// The phase this event reports on.
    pub phase: Phase,

    /// The outcome of the phase.
    pub outcome: Outcome,

    /// The time at which the phase began.
    pub timestamp: Option<DateTime<FixedOffset>>,

    /// The time taken by the phase.
    pub duration: Duration,

    /// Output captured during the phase.
    pub output: Option<String>,

    /// Failure details, for failed or errored phases.
    pub failure: Option<Failure>,

    /// The skip reason, for skipped outcomes.
    pub reason: Option<String>,

    /// The number of assertions executed during the phase.
    pub asserts: usize,
}

impl CaseEvent {
    /// Creates a new event with no timing, output or failure payload.
    pub fn new(
        test_id: impl Into<String>,
        name: impl Into<String>,
        suite_path: impl IntoIterator<Item = impl Into<String>>,
        phase: Phase,
        outcome: Outcome,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            name: name.into(),
            suite_path: suite_path.into_iter().map(|s| s.into()).collect(),
            phase,
            outcome,
            timestamp: None,
            duration: Duration::ZERO,
            output: None,
            failure: None,
            reason: None,
            asserts: 0,
        }
    }

    /// Sets the start timestamp of the phase.
    pub fn set_timestamp(&mut self, timestamp: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Sets the time taken by the phase.
    pub fn set_duration(&mut self, duration: Duration) -> &mut Self {
        self.duration = duration;
        self
    }

    /// Sets output captured during the phase.
    pub fn set_output(&mut self, output: impl Into<String>) -> &mut Self {
        self.output = Some(output.into());
        self
    }

    /// Sets the failure payload.
    pub fn set_failure(&mut self, failure: Failure) -> &mut Self {
        self.failure = Some(failure);
        self
    }

    /// Sets the skip reason.
    pub fn set_reason(&mut self, reason: impl Into<String>) -> &mut Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the number of assertions executed during the phase.
    pub fn set_asserts(&mut self, asserts: usize) -> &mut Self {
        self.asserts = asserts;
        self
    }
}
