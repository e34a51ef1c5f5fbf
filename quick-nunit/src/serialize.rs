// Copyright (c) The quick-nunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a `TestRun`.

use crate::{
    errors::SerializeError, Failure, Filter, Output, Property, TestCase, TestRun, TestSuite,
};
use chrono::{DateTime, FixedOffset};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use std::{io, time::Duration};

static TEST_RUN_TAG: &str = "test-run";
static TEST_SUITE_TAG: &str = "test-suite";
static TEST_CASE_TAG: &str = "test-case";
static PROPERTIES_TAG: &str = "properties";
static PROPERTY_TAG: &str = "property";
static COMMAND_LINE_TAG: &str = "command-line";
static FILTER_TAG: &str = "filter";
static FAILURE_TAG: &str = "failure";
static MESSAGE_TAG: &str = "message";
static STACK_TRACE_TAG: &str = "stack-trace";
static REASON_TAG: &str = "reason";
static OUTPUT_TAG: &str = "output";
static NOT_TAG: &str = "not";
static AND_TAG: &str = "and";
static OR_TAG: &str = "or";

pub(crate) fn serialize_report(
    run: &TestRun,
    writer: impl io::Write,
) -> Result<(), SerializeError> {
    let mut writer = Writer::new_with_indent(writer, b' ', 2);

    let decl = BytesDecl::new("1.0", Some("UTF-8"), None);
    writer.write_event(Event::Decl(decl))?;

    serialize_test_run(run, &mut writer)
}

fn serialize_test_run(
    run: &TestRun,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let TestRun {
        id,
        name,
        fullname,
        command_line,
        filter,
        result,
        total,
        passed,
        failed,
        warnings,
        inconclusive,
        skipped,
        asserts,
        random_seed,
        start_time,
        end_time,
        duration,
        suites,
        properties,
        extra,
    } = run;

    let mut run_tag = BytesStart::new(TEST_RUN_TAG);
    run_tag.extend_attributes([
        ("id", id.to_string().as_str()),
        ("name", name.as_str()),
        ("fullname", fullname.as_str()),
        ("testcasecount", total.to_string().as_str()),
        ("result", result.as_str()),
    ]);
    serialize_timing(start_time, end_time, duration, &mut run_tag);
    run_tag.extend_attributes([
        ("total", total.to_string().as_str()),
        ("passed", passed.to_string().as_str()),
        ("failed", failed.to_string().as_str()),
        ("warnings", warnings.to_string().as_str()),
        ("inconclusive", inconclusive.to_string().as_str()),
        ("skipped", skipped.to_string().as_str()),
        ("asserts", asserts.to_string().as_str()),
    ]);
    if let Some(seed) = random_seed {
        run_tag.push_attribute(("random-seed", seed.to_string().as_str()));
    }
    for (k, v) in extra {
        run_tag.push_attribute((k.as_str(), v.as_str()));
    }
    writer.write_event(Event::Start(run_tag))?;

    if let Some(command_line) = command_line {
        serialize_text_element(COMMAND_LINE_TAG, command_line, writer)?;
    }
    if let Some(filter) = filter {
        serialize_empty_start_tag(FILTER_TAG, writer)?;
        serialize_filter_node(filter, writer)?;
        serialize_end_tag(FILTER_TAG, writer)?;
    }
    serialize_properties(properties, writer)?;

    for suite in suites {
        serialize_test_suite(suite, writer)?;
    }

    serialize_end_tag(TEST_RUN_TAG, writer)?;
    writer.write_event(Event::Eof)?;

    Ok(())
}

pub(crate) fn serialize_test_suite(
    suite: &TestSuite,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let TestSuite {
        id,
        name,
        fullname,
        suite_type,
        run_state,
        result,
        site,
        label,
        total,
        passed,
        failed,
        warnings,
        inconclusive,
        skipped,
        asserts,
        start_time,
        end_time,
        duration,
        suites,
        cases,
        properties,
        output,
        failure,
        reason,
        extra,
    } = suite;

    let mut suite_tag = BytesStart::new(TEST_SUITE_TAG);
    suite_tag.extend_attributes([
        ("type", suite_type.as_str()),
        ("id", id.as_str()),
        ("name", name.as_str()),
        ("fullname", fullname.as_str()),
        ("runstate", run_state.as_str()),
        ("testcasecount", total.to_string().as_str()),
        ("result", result.as_str()),
    ]);
    if let Some(label) = label {
        suite_tag.push_attribute(("label", label.as_str()));
    }
    if let Some(site) = site {
        suite_tag.push_attribute(("site", site.as_str()));
    }
    serialize_timing(start_time, end_time, duration, &mut suite_tag);
    suite_tag.extend_attributes([
        ("total", total.to_string().as_str()),
        ("passed", passed.to_string().as_str()),
        ("failed", failed.to_string().as_str()),
        ("warnings", warnings.to_string().as_str()),
        ("inconclusive", inconclusive.to_string().as_str()),
        ("skipped", skipped.to_string().as_str()),
        ("asserts", asserts.to_string().as_str()),
    ]);
    for (k, v) in extra {
        suite_tag.push_attribute((k.as_str(), v.as_str()));
    }
    writer.write_event(Event::Start(suite_tag))?;

    serialize_properties(properties, writer)?;
    if let Some(failure) = failure {
        serialize_failure(failure, writer)?;
    }
    if let Some(reason) = reason {
        serialize_reason(reason, writer)?;
    }

    for child in suites {
        serialize_test_suite(child, writer)?;
    }
    for case in cases {
        serialize_test_case(case, writer)?;
    }

    if let Some(output) = output {
        serialize_output(output, writer)?;
    }

    serialize_end_tag(TEST_SUITE_TAG, writer)?;
    Ok(())
}

fn serialize_test_case(
    case: &TestCase,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let TestCase {
        id,
        name,
        fullname,
        classname,
        methodname,
        seed,
        run_state,
        result,
        site,
        label,
        asserts,
        start_time,
        end_time,
        duration,
        output,
        failure,
        reason,
        properties,
        extra,
    } = case;

    let mut case_tag = BytesStart::new(TEST_CASE_TAG);
    case_tag.extend_attributes([
        ("id", id.as_str()),
        ("name", name.as_str()),
        ("fullname", fullname.as_str()),
    ]);
    if let Some(methodname) = methodname {
        case_tag.push_attribute(("methodname", methodname.as_str()));
    }
    if let Some(classname) = classname {
        case_tag.push_attribute(("classname", classname.as_str()));
    }
    case_tag.push_attribute(("runstate", run_state.as_str()));
    if let Some(seed) = seed {
        case_tag.push_attribute(("seed", seed.to_string().as_str()));
    }
    case_tag.push_attribute(("result", result.as_str()));
    if let Some(label) = label {
        case_tag.push_attribute(("label", label.as_str()));
    }
    if let Some(site) = site {
        case_tag.push_attribute(("site", site.as_str()));
    }
    serialize_timing(start_time, end_time, duration, &mut case_tag);
    case_tag.push_attribute(("asserts", asserts.to_string().as_str()));
    for (k, v) in extra {
        case_tag.push_attribute((k.as_str(), v.as_str()));
    }
    writer.write_event(Event::Start(case_tag))?;

    serialize_properties(properties, writer)?;
    if let Some(failure) = failure {
        serialize_failure(failure, writer)?;
    }
    if let Some(reason) = reason {
        serialize_reason(reason, writer)?;
    }
    if let Some(output) = output {
        serialize_output(output, writer)?;
    }

    serialize_end_tag(TEST_CASE_TAG, writer)?;

    Ok(())
}

fn serialize_filter_node(
    filter: &Filter,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    match filter {
        Filter::Not(child) => {
            serialize_empty_start_tag(NOT_TAG, writer)?;
            serialize_filter_node(child, writer)?;
            serialize_end_tag(NOT_TAG, writer)?;
        }
        Filter::And(children) => {
            serialize_empty_start_tag(AND_TAG, writer)?;
            for child in children {
                serialize_filter_node(child, writer)?;
            }
            serialize_end_tag(AND_TAG, writer)?;
        }
        Filter::Or(children) => {
            serialize_empty_start_tag(OR_TAG, writer)?;
            for child in children {
                serialize_filter_node(child, writer)?;
            }
            serialize_end_tag(OR_TAG, writer)?;
        }
        Filter::Match(value_match) => {
            let tag_name = value_match.field.as_tag();
            let mut tag = BytesStart::new(tag_name);
            if value_match.regex {
                tag.push_attribute(("re", "1"));
            }
            writer.write_event(Event::Start(tag))?;
            writer.write_event(Event::Text(BytesText::new(&value_match.value)))?;
            serialize_end_tag(tag_name, writer)?;
        }
    }
    Ok(())
}

fn serialize_properties(
    properties: &[Property],
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    if properties.is_empty() {
        return Ok(());
    }
    serialize_empty_start_tag(PROPERTIES_TAG, writer)?;
    for property in properties {
        let mut property_tag = BytesStart::new(PROPERTY_TAG);
        property_tag.extend_attributes([
            ("name", property.name.as_str()),
            ("value", property.value.as_str()),
        ]);
        writer.write_event(Event::Empty(property_tag))?;
    }
    serialize_end_tag(PROPERTIES_TAG, writer)
}

fn serialize_failure(
    failure: &Failure,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    if failure.message.is_none() && failure.stack_trace.is_none() {
        let tag = BytesStart::new(FAILURE_TAG);
        writer.write_event(Event::Empty(tag))?;
        return Ok(());
    }
    serialize_empty_start_tag(FAILURE_TAG, writer)?;
    if let Some(message) = &failure.message {
        serialize_text_element(MESSAGE_TAG, message, writer)?;
    }
    if let Some(stack_trace) = &failure.stack_trace {
        serialize_text_element(STACK_TRACE_TAG, stack_trace, writer)?;
    }
    serialize_end_tag(FAILURE_TAG, writer)
}

fn serialize_reason(
    reason: &str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    serialize_empty_start_tag(REASON_TAG, writer)?;
    serialize_text_element(MESSAGE_TAG, reason, writer)?;
    serialize_end_tag(REASON_TAG, writer)
}

fn serialize_output(
    output: &Output,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    serialize_text_element(OUTPUT_TAG, output.as_str(), writer)
}

// Absent timing attributes are omitted, never emitted as empty placeholders.
fn serialize_timing(
    start_time: &Option<DateTime<FixedOffset>>,
    end_time: &Option<DateTime<FixedOffset>>,
    duration: &Option<Duration>,
    tag: &mut BytesStart<'_>,
) {
    if let Some(start_time) = start_time {
        tag.push_attribute(("start-time", format!("{}", start_time.format("%+")).as_str()));
    }
    if let Some(end_time) = end_time {
        tag.push_attribute(("end-time", format!("{}", end_time.format("%+")).as_str()));
    }
    if let Some(duration) = duration {
        // Decimal seconds, shortest form that round-trips; no forced
        // precision cutoff.
        tag.push_attribute(("duration", duration.as_secs_f64().to_string().as_str()));
    }
}

fn serialize_text_element(
    tag_name: &'static str,
    text: &str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    serialize_empty_start_tag(tag_name, writer)?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    serialize_end_tag(tag_name, writer)
}

fn serialize_empty_start_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let tag = BytesStart::new(tag_name);
    writer.write_event(Event::Start(tag))?;
    Ok(())
}

fn serialize_end_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let end_tag = BytesEnd::new(tag_name);
    writer.write_event(Event::End(end_tag))?;
    Ok(())
}
