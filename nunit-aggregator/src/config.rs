// Copyright (c) The quick-nunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use quick_nunit::Filter;

/// Configuration for one aggregation session.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// The name of the run; also names the synthetic root suite for tests
    /// reported without an ancestor path.
    pub name: String,

    /// The command line that started the session, recorded for provenance.
    pub command_line: Option<String>,

    /// The filter describing which tests were selected.
    pub filter: Option<Filter>,

    /// The random seed used for test ordering.
    pub random_seed: Option<u64>,

    /// How repeated terminal outcomes for the same test are resolved.
    pub retry_policy: RetryPolicy,
}

impl RunConfig {
    /// Creates a new config with the default retry policy.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command_line: None,
            filter: None,
            random_seed: None,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Sets the command line.
    pub fn set_command_line(&mut self, command_line: impl Into<String>) -> &mut Self {
        self.command_line = Some(command_line.into());
        self
    }

    /// Sets the test-selection filter.
    pub fn set_filter(&mut self, filter: Filter) -> &mut Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the random seed.
    pub fn set_random_seed(&mut self, seed: u64) -> &mut Self {
        self.random_seed = Some(seed);
        self
    }

    /// Sets the retry policy.
    pub fn set_retry_policy(&mut self, retry_policy: RetryPolicy) -> &mut Self {
        self.retry_policy = retry_policy;
        self
    }
}

/// How the aggregator resolves events arriving after a test already has a
/// terminal result, as happens when a flaky test is retried.
///
/// Either way a test is counted exactly once.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum RetryPolicy {
    /// The final attempt's outcome is reported. This matches hosts that
    /// rerun failing tests and treat the last attempt as authoritative.
    #[default]
    LastOutcomeWins,

    /// The first terminal outcome is reported; later events for the same
    /// test are ignored.
    FirstTerminalWins,
}
