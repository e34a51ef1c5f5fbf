// Copyright (c) The quick-nunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// A non-fatal problem recorded during aggregation.
///
/// Issues never abort the session or change the host's outcome; they are
/// logged when they occur and kept on the aggregator for inspection.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AggregatorIssue {
    /// The same test id was reported under two different suite paths. The
    /// first placement wins.
    #[error(
        "test `{test_id}` reported under conflicting suites: \
         first `{first_path}`, then `{second_path}`"
    )]
    DuplicateIdentity {
        /// The test id in conflict.
        test_id: String,

        /// The dotted suite path the test was first reported under.
        first_path: String,

        /// The dotted suite path of the conflicting report.
        second_path: String,
    },
}
