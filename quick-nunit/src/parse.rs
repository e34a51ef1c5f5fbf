// Copyright (c) The quick-nunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parse an NUnit report back into a `TestRun`.
//!
//! Parsing is lax: unknown elements are skipped and unknown attributes are
//! kept in the `extra` bags, but values for schema-typed attributes must
//! match the schema's types and closed enumerations.

use crate::{
    errors::{ParseError, SchemaMismatch},
    Failure, Filter, FilterField, Output, Property, TestCase, TestResult, TestRun, TestSuite,
    SuiteType, ValueMatch,
};
use chrono::{DateTime, FixedOffset};
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use std::time::Duration;
use uuid::Uuid;

/// Parses a serialized NUnit report.
///
/// Round-tripping a [`TestRun`] through [`TestRun::serialize`] and this
/// function reproduces identical counters and structure.
pub fn parse_report(input: &str) -> Result<TestRun, ParseError> {
    let mut reader = Reader::from_str(input);
    loop {
        match reader.read_event()? {
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Text(_) => {}
            Event::Start(start) if start.name().as_ref() == b"test-run" => {
                return parse_test_run(&mut reader, &start);
            }
            Event::Eof => return Err(ParseError::MissingRoot),
            _ => return Err(ParseError::MissingRoot),
        }
    }
}

fn parse_test_run(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<TestRun, ParseError> {
    let mut run = TestRun::new("");
    for attr in start.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.into_owned();
        match attr.key.as_ref() {
            b"id" => run.id = Uuid::parse_str(&value)?,
            b"name" => run.name = value,
            b"fullname" => run.fullname = value,
            // Redundant with `total`; validated implicitly by round-trip.
            b"testcasecount" => {
                parse_usize("testcasecount", &value)?;
            }
            b"result" => run.result = value.parse::<TestResult>()?,
            b"total" => run.total = parse_usize("total", &value)?,
            b"passed" => run.passed = parse_usize("passed", &value)?,
            b"failed" => run.failed = parse_usize("failed", &value)?,
            b"warnings" => run.warnings = parse_usize("warnings", &value)?,
            b"inconclusive" => run.inconclusive = parse_usize("inconclusive", &value)?,
            b"skipped" => run.skipped = parse_usize("skipped", &value)?,
            b"asserts" => run.asserts = parse_usize("asserts", &value)?,
            b"random-seed" => run.random_seed = Some(parse_u64("random-seed", &value)?),
            b"start-time" => run.start_time = Some(parse_timestamp("start-time", &value)?),
            b"end-time" => run.end_time = Some(parse_timestamp("end-time", &value)?),
            b"duration" => run.duration = Some(parse_duration(&value)?),
            key => {
                run.extra
                    .insert(String::from_utf8_lossy(key).into_owned(), value);
            }
        }
    }

    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.name().as_ref() {
                b"test-suite" => {
                    let suite = parse_test_suite(reader, &start)?;
                    run.suites.push(suite);
                }
                b"command-line" => {
                    run.command_line = Some(read_text(reader, b"command-line")?);
                }
                b"filter" => run.filter = Some(parse_filter(reader)?),
                b"properties" => run.properties = parse_properties(reader)?,
                _ => {
                    reader.read_to_end(start.name())?;
                }
            },
            Event::Empty(_) | Event::Text(_) | Event::CData(_) | Event::Comment(_) => {}
            Event::End(end) if end.name().as_ref() == b"test-run" => break,
            Event::End(_) => {}
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => {}
        }
    }
    Ok(run)
}

fn parse_test_suite(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<TestSuite, ParseError> {
    let mut suite = TestSuite::new("", "", SuiteType::TestSuite);
    let mut name = None;
    let mut fullname = None;
    for attr in start.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.into_owned();
        match attr.key.as_ref() {
            b"type" => suite.suite_type = value.parse::<SuiteType>()?,
            b"id" => suite.id = value,
            b"name" => name = Some(value),
            b"fullname" => fullname = Some(value),
            b"runstate" => suite.run_state = value.parse()?,
            b"testcasecount" => {
                parse_usize("testcasecount", &value)?;
            }
            b"result" => suite.result = value.parse::<TestResult>()?,
            b"label" => suite.label = Some(value),
            b"site" => suite.site = Some(value.parse()?),
            b"total" => suite.total = parse_usize("total", &value)?,
            b"passed" => suite.passed = parse_usize("passed", &value)?,
            b"failed" => suite.failed = parse_usize("failed", &value)?,
            b"warnings" => suite.warnings = parse_usize("warnings", &value)?,
            b"inconclusive" => suite.inconclusive = parse_usize("inconclusive", &value)?,
            b"skipped" => suite.skipped = parse_usize("skipped", &value)?,
            b"asserts" => suite.asserts = parse_usize("asserts", &value)?,
            b"start-time" => suite.start_time = Some(parse_timestamp("start-time", &value)?),
            b"end-time" => suite.end_time = Some(parse_timestamp("end-time", &value)?),
            b"duration" => suite.duration = Some(parse_duration(&value)?),
            key => {
                suite
                    .extra
                    .insert(String::from_utf8_lossy(key).into_owned(), value);
            }
        }
    }
    suite.name = name.ok_or(ParseError::MissingAttribute {
        element: "test-suite",
        attribute: "name",
    })?;
    suite.fullname = fullname.unwrap_or_else(|| suite.name.clone());

    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.name().as_ref() {
                b"test-suite" => {
                    let child = parse_test_suite(reader, &start)?;
                    suite.suites.push(child);
                }
                b"test-case" => {
                    let case = parse_test_case(reader, &start)?;
                    suite.cases.push(case);
                }
                b"properties" => suite.properties = parse_properties(reader)?,
                b"failure" => suite.failure = Some(parse_failure(reader)?),
                b"reason" => suite.reason = Some(parse_reason(reader)?),
                b"output" => suite.output = Some(Output::new(read_text(reader, b"output")?)),
                _ => {
                    reader.read_to_end(start.name())?;
                }
            },
            Event::Empty(empty) => {
                if empty.name().as_ref() == b"failure" {
                    suite.failure = Some(Failure::default());
                }
            }
            Event::Text(_) | Event::CData(_) | Event::Comment(_) => {}
            Event::End(end) if end.name().as_ref() == b"test-suite" => break,
            Event::End(_) => {}
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => {}
        }
    }
    Ok(suite)
}

fn parse_test_case(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<TestCase, ParseError> {
    let mut case = TestCase::new("", "");
    let mut id = None;
    let mut name = None;
    let mut fullname = None;
    for attr in start.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.into_owned();
        match attr.key.as_ref() {
            b"id" => id = Some(value),
            b"name" => name = Some(value),
            b"fullname" => fullname = Some(value),
            b"methodname" => case.methodname = Some(value),
            b"classname" => case.classname = Some(value),
            b"runstate" => case.run_state = value.parse()?,
            b"seed" => case.seed = Some(parse_u64("seed", &value)?),
            b"result" => case.result = value.parse::<TestResult>()?,
            b"label" => case.label = Some(value),
            b"site" => case.site = Some(value.parse()?),
            b"asserts" => case.asserts = parse_usize("asserts", &value)?,
            b"start-time" => case.start_time = Some(parse_timestamp("start-time", &value)?),
            b"end-time" => case.end_time = Some(parse_timestamp("end-time", &value)?),
            b"duration" => case.duration = Some(parse_duration(&value)?),
            key => {
                case.extra
                    .insert(String::from_utf8_lossy(key).into_owned(), value);
            }
        }
    }
    case.id = id.ok_or(ParseError::MissingAttribute {
        element: "test-case",
        attribute: "id",
    })?;
    case.name = name.ok_or(ParseError::MissingAttribute {
        element: "test-case",
        attribute: "name",
    })?;
    case.fullname = fullname.unwrap_or_else(|| case.name.clone());

    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.name().as_ref() {
                b"properties" => case.properties = parse_properties(reader)?,
                b"failure" => case.failure = Some(parse_failure(reader)?),
                b"reason" => case.reason = Some(parse_reason(reader)?),
                b"output" => case.output = Some(Output::new(read_text(reader, b"output")?)),
                _ => {
                    reader.read_to_end(start.name())?;
                }
            },
            Event::Empty(empty) => {
                if empty.name().as_ref() == b"failure" {
                    case.failure = Some(Failure::default());
                }
            }
            Event::Text(_) | Event::CData(_) | Event::Comment(_) => {}
            Event::End(end) if end.name().as_ref() == b"test-case" => break,
            Event::End(_) => {}
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => {}
        }
    }
    Ok(case)
}

fn parse_properties(reader: &mut Reader<&[u8]>) -> Result<Vec<Property>, ParseError> {
    let mut properties = vec![];
    loop {
        match reader.read_event()? {
            Event::Empty(empty) | Event::Start(empty)
                if empty.name().as_ref() == b"property" =>
            {
                let mut name = String::new();
                let mut value = String::new();
                for attr in empty.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"name" => name = attr.unescape_value()?.into_owned(),
                        b"value" => value = attr.unescape_value()?.into_owned(),
                        _ => {}
                    }
                }
                properties.push(Property::new(name, value));
            }
            Event::Start(start) => {
                reader.read_to_end(start.name())?;
            }
            Event::Empty(_) | Event::Text(_) | Event::CData(_) | Event::Comment(_) => {}
            Event::End(end) if end.name().as_ref() == b"properties" => break,
            Event::End(_) => {}
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => {}
        }
    }
    Ok(properties)
}

fn parse_failure(reader: &mut Reader<&[u8]>) -> Result<Failure, ParseError> {
    let mut failure = Failure::default();
    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.name().as_ref() {
                b"message" => failure.message = Some(read_text(reader, b"message")?),
                b"stack-trace" => failure.stack_trace = Some(read_text(reader, b"stack-trace")?),
                _ => {
                    reader.read_to_end(start.name())?;
                }
            },
            Event::Empty(_) | Event::Text(_) | Event::CData(_) | Event::Comment(_) => {}
            Event::End(end) if end.name().as_ref() == b"failure" => break,
            Event::End(_) => {}
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => {}
        }
    }
    Ok(failure)
}

fn parse_reason(reader: &mut Reader<&[u8]>) -> Result<String, ParseError> {
    let mut message = String::new();
    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.name().as_ref() {
                b"message" => message = read_text(reader, b"message")?,
                _ => {
                    reader.read_to_end(start.name())?;
                }
            },
            Event::Empty(_) | Event::Text(_) | Event::CData(_) | Event::Comment(_) => {}
            Event::End(end) if end.name().as_ref() == b"reason" => break,
            Event::End(_) => {}
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => {}
        }
    }
    Ok(message)
}

fn parse_filter(reader: &mut Reader<&[u8]>) -> Result<Filter, ParseError> {
    let mut children = parse_filter_children(reader, b"filter")?;
    if children.len() == 1 {
        Ok(children.remove(0))
    } else {
        Ok(Filter::And(children))
    }
}

fn parse_filter_children(
    reader: &mut Reader<&[u8]>,
    end_name: &[u8],
) -> Result<Vec<Filter>, ParseError> {
    let mut children = vec![];
    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.name().as_ref() {
                b"not" => {
                    let mut inner = parse_filter_children(reader, b"not")?;
                    let child = if inner.len() == 1 {
                        inner.remove(0)
                    } else {
                        Filter::And(inner)
                    };
                    children.push(Filter::Not(Box::new(child)));
                }
                b"and" => children.push(Filter::And(parse_filter_children(reader, b"and")?)),
                b"or" => children.push(Filter::Or(parse_filter_children(reader, b"or")?)),
                _ => {
                    let name = start.name().as_ref().to_vec();
                    let field = filter_field(&name)?;
                    let regex = leaf_regex_flag(&start)?;
                    let value = read_text(reader, &name)?;
                    children.push(Filter::Match(ValueMatch {
                        field,
                        value,
                        regex,
                    }));
                }
            },
            Event::Empty(empty) => match empty.name().as_ref() {
                b"not" | b"and" | b"or" => {}
                _ => {
                    let field = filter_field(empty.name().as_ref())?;
                    let regex = leaf_regex_flag(&empty)?;
                    children.push(Filter::Match(ValueMatch {
                        field,
                        value: String::new(),
                        regex,
                    }));
                }
            },
            Event::Text(_) | Event::CData(_) | Event::Comment(_) => {}
            Event::End(end) if end.name().as_ref() == end_name => break,
            Event::End(_) => {}
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => {}
        }
    }
    Ok(children)
}

fn filter_field(name: &[u8]) -> Result<FilterField, ParseError> {
    let name = String::from_utf8_lossy(name);
    Ok(name.parse::<FilterField>()?)
}

fn leaf_regex_flag(start: &BytesStart<'_>) -> Result<bool, ParseError> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"re" {
            let value = attr.unescape_value()?;
            return Ok(value == "1" || value == "true");
        }
    }
    Ok(false)
}

fn read_text(reader: &mut Reader<&[u8]>, end_name: &[u8]) -> Result<String, ParseError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::Start(start) => {
                reader.read_to_end(start.name())?;
            }
            Event::Empty(_) | Event::Comment(_) => {}
            Event::End(end) if end.name().as_ref() == end_name => break,
            Event::End(_) => {}
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => {}
        }
    }
    Ok(text)
}

fn parse_usize(attribute: &str, value: &str) -> Result<usize, ParseError> {
    value.parse().map_err(|source| ParseError::InvalidInt {
        attribute: attribute.to_owned(),
        source,
    })
}

fn parse_u64(attribute: &str, value: &str) -> Result<u64, ParseError> {
    value.parse().map_err(|source| ParseError::InvalidInt {
        attribute: attribute.to_owned(),
        source,
    })
}

fn parse_timestamp(attribute: &str, value: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    DateTime::parse_from_rfc3339(value).map_err(|source| ParseError::InvalidTimestamp {
        attribute: attribute.to_owned(),
        source,
    })
}

fn parse_duration(value: &str) -> Result<Duration, ParseError> {
    let secs: f64 = value.parse().map_err(|source| ParseError::InvalidDuration {
        attribute: "duration".to_owned(),
        source,
    })?;
    // Rejects negatives, NaN, infinities and values beyond Duration's range.
    Duration::try_from_secs_f64(secs).map_err(|_| SchemaMismatch::new("duration", value).into())
}
