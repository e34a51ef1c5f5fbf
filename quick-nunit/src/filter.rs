// Copyright (c) The quick-nunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test-selection filter expression tree.
//!
//! A filter is built once from the host's selection criteria, attached to the
//! run, and never mutated during aggregation.

use crate::errors::SchemaMismatch;
use std::str::FromStr;

/// A boolean expression describing which tests were selected to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    /// Negation of a single child expression.
    Not(Box<Filter>),

    /// Conjunction of child expressions.
    And(Vec<Filter>),

    /// Disjunction of child expressions.
    Or(Vec<Filter>),

    /// A leaf match on a single field.
    Match(ValueMatch),
}

impl Filter {
    /// Creates a leaf filter matching `field` against a literal value.
    pub fn matching(field: FilterField, value: impl Into<String>) -> Self {
        Filter::Match(ValueMatch {
            field,
            value: value.into(),
            regex: false,
        })
    }

    /// Creates a leaf filter matching `field` against a regular expression.
    pub fn matching_regex(field: FilterField, pattern: impl Into<String>) -> Self {
        Filter::Match(ValueMatch {
            field,
            value: pattern.into(),
            regex: true,
        })
    }
}

/// A leaf match: one field compared against a pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueMatch {
    /// The field being matched.
    pub field: FilterField,

    /// The literal value or regular expression pattern.
    pub value: String,

    /// Whether `value` is a regular expression (the `re` attribute).
    pub regex: bool,
}

/// The field a leaf filter matches on. Each field maps to a distinct element
/// name in the serialized filter.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FilterField {
    /// A test category (`cat`).
    Category,

    /// A class name (`class`).
    Class,

    /// A full test name (`test`).
    Test,

    /// A test id (`id`).
    Id,

    /// A method name (`method`).
    Method,

    /// A namespace (`namespace`).
    Namespace,

    /// A display name (`name`).
    Name,

    /// A property value (`prop`).
    Property,
}

impl FilterField {
    /// Returns the element name used for this field in the schema.
    pub fn as_tag(&self) -> &'static str {
        match self {
            FilterField::Category => "cat",
            FilterField::Class => "class",
            FilterField::Test => "test",
            FilterField::Id => "id",
            FilterField::Method => "method",
            FilterField::Namespace => "namespace",
            FilterField::Name => "name",
            FilterField::Property => "prop",
        }
    }
}

impl FromStr for FilterField {
    type Err = SchemaMismatch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cat" => Ok(FilterField::Category),
            "class" => Ok(FilterField::Class),
            "test" => Ok(FilterField::Test),
            "id" => Ok(FilterField::Id),
            "method" => Ok(FilterField::Method),
            "namespace" => Ok(FilterField::Namespace),
            "name" => Ok(FilterField::Name),
            "prop" => Ok(FilterField::Property),
            other => Err(SchemaMismatch::new("filter element", other)),
        }
    }
}
