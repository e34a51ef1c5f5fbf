// Copyright (c) The quick-nunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregate test lifecycle events into NUnit reports.
//!
//! A host test runner drives a [`RunAggregator`] with one [`CaseEvent`] per
//! lifecycle phase outcome (setup, call, teardown). The aggregator keeps one
//! case record per test id, resolves phase precedence (a fixture failure
//! masks the test body's own outcome), and at the end of the session rolls
//! counts and statuses up through the suite tree into a
//! [`TestRun`](quick_nunit::TestRun) ready for serialization.
//!
//! The aggregator never executes or discovers tests, and it never affects
//! the host's own exit status: identity conflicts are recorded as
//! [`AggregatorIssue`]s and the report is produced best-effort.

mod aggregator;
mod config;
mod errors;
mod events;

pub use aggregator::*;
pub use config::*;
pub use errors::*;
pub use events::*;
