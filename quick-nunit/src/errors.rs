// Copyright (c) The quick-nunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use quick_xml::events::attributes::AttrError;
use std::io;
use thiserror::Error;

/// An error that occurs while serializing a [`TestRun`](crate::TestRun).
///
/// Returned by [`TestRun::serialize`](crate::TestRun::serialize) and
/// [`TestRun::to_string`](crate::TestRun::to_string).
#[derive(Debug, Error)]
pub enum SerializeError {
    /// An error produced by the XML writer.
    #[error("error serializing NUnit report")]
    Xml(#[from] quick_xml::Error),

    /// An I/O error while writing the report.
    #[error("I/O error serializing NUnit report")]
    Io(#[from] io::Error),
}

/// A value that does not match the schema's type or closed enumeration.
///
/// This is fatal to report generation: an unknown `result`, `site`,
/// `runstate` or suite `type` cannot be represented in the output schema.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} value `{value}`")]
pub struct SchemaMismatch {
    pub(crate) kind: &'static str,
    pub(crate) value: String,
}

impl SchemaMismatch {
    pub(crate) fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// An error that occurs while parsing an NUnit report.
///
/// Returned by [`parse_report`](crate::parse_report).
#[derive(Debug, Error)]
pub enum ParseError {
    /// An error produced by the XML reader.
    #[error("error reading NUnit report")]
    Xml(#[from] quick_xml::Error),

    /// A malformed attribute list.
    #[error("malformed attribute in NUnit report")]
    Attr(#[from] AttrError),

    /// The document does not have a `test-run` root element.
    #[error("document has no `test-run` root element")]
    MissingRoot,

    /// The document ended before the root element was closed.
    #[error("unexpected end of document")]
    UnexpectedEof,

    /// A value did not match the schema's type or closed enumeration.
    #[error(transparent)]
    Schema(#[from] SchemaMismatch),

    /// An attribute that should be a non-negative integer was not.
    #[error("invalid integer in attribute `{attribute}`")]
    InvalidInt {
        attribute: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// An attribute that should be a decimal seconds value was not.
    #[error("invalid duration in attribute `{attribute}`")]
    InvalidDuration {
        attribute: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    /// An attribute that should be an RFC 3339 timestamp was not.
    #[error("invalid timestamp in attribute `{attribute}`")]
    InvalidTimestamp {
        attribute: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The run `id` attribute was not a UUID.
    #[error("invalid run id")]
    InvalidRunId(#[from] uuid::Error),

    /// A required attribute was missing from an element.
    #[error("element `{element}` is missing required attribute `{attribute}`")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
}
