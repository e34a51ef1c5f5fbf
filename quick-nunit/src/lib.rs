// Copyright (c) The quick-nunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generate and read NUnit 3 test-result reports in Rust.
//!
//! This crate contains the report tree model (`test-run` / `test-suite` /
//! `test-case`), the filter expression tree, and a serializer and parser for
//! the NUnit `TestResult.xsd` schema. It does not run tests itself: a test
//! runner builds a [`TestRun`] (usually through an aggregation layer) and
//! serializes it at the end of the session.

mod errors;
mod filter;
mod parse;
mod report;
mod serialize;

pub use errors::*;
pub use filter::*;
pub use parse::parse_report;
pub use report::*;
