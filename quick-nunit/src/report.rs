// Copyright (c) The quick-nunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{errors::SchemaMismatch, filter::Filter, serialize::serialize_report, SerializeError};
use chrono::{DateTime, FixedOffset};
use indexmap::map::IndexMap;
use std::{io, str::FromStr, time::Duration};
use uuid::Uuid;

/// The root element of an NUnit report: one full test session.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct TestRun {
    /// The unique id of this run.
    pub id: Uuid,

    /// The name of this run.
    pub name: String,

    /// The full name of this run. Defaults to the name.
    pub fullname: String,

    /// The command line that started the session, for provenance.
    pub command_line: Option<String>,

    /// The filter describing which tests were selected to run.
    ///
    /// Constructed once from the host's selection criteria and never mutated
    /// during aggregation.
    pub filter: Option<Filter>,

    /// The rolled-up result of the run.
    pub result: TestResult,

    /// The total number of test cases from all suites.
    pub total: usize,

    /// The number of passed test cases.
    pub passed: usize,

    /// The number of failed test cases (including errors).
    pub failed: usize,

    /// The number of test cases that ended with a warning.
    pub warnings: usize,

    /// The number of inconclusive test cases.
    pub inconclusive: usize,

    /// The number of skipped test cases.
    pub skipped: usize,

    /// The total number of assertions across all test cases.
    pub asserts: usize,

    /// The random seed used for test ordering, if the host reported one.
    pub random_seed: Option<u64>,

    /// The time at which the first test began execution.
    pub start_time: Option<DateTime<FixedOffset>>,

    /// The time at which the last test finished execution.
    pub end_time: Option<DateTime<FixedOffset>>,

    /// The overall time taken by the run.
    ///
    /// This is serialized as a decimal number of seconds.
    pub duration: Option<Duration>,

    /// The top-level suites contained in this run.
    pub suites: Vec<TestSuite>,

    /// Custom properties attached to the run.
    pub properties: Vec<Property>,

    /// Other fields that may be set as attributes. The schema is validated in
    /// lax mode, so extension attributes are carried through untouched.
    pub extra: IndexMap<String, String>,
}

impl TestRun {
    /// Creates a new `TestRun` with the given name and a random id.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            fullname: name.clone(),
            name,
            command_line: None,
            filter: None,
            result: TestResult::Inconclusive,
            total: 0,
            passed: 0,
            failed: 0,
            warnings: 0,
            inconclusive: 0,
            skipped: 0,
            asserts: 0,
            random_seed: None,
            start_time: None,
            end_time: None,
            duration: None,
            suites: vec![],
            properties: vec![],
            extra: IndexMap::new(),
        }
    }

    /// Sets the id of the run.
    pub fn set_id(&mut self, id: Uuid) -> &mut Self {
        self.id = id;
        self
    }

    /// Sets the full name of the run.
    pub fn set_fullname(&mut self, fullname: impl Into<String>) -> &mut Self {
        self.fullname = fullname.into();
        self
    }

    /// Sets the command line recorded for provenance.
    pub fn set_command_line(&mut self, command_line: impl Into<String>) -> &mut Self {
        self.command_line = Some(command_line.into());
        self
    }

    /// Attaches the test-selection filter.
    pub fn set_filter(&mut self, filter: Filter) -> &mut Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the random seed.
    pub fn set_random_seed(&mut self, seed: u64) -> &mut Self {
        self.random_seed = Some(seed);
        self
    }

    /// Sets the start timestamp for the run.
    pub fn set_start_time(&mut self, start_time: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.start_time = Some(start_time.into());
        self
    }

    /// Sets the end timestamp for the run.
    pub fn set_end_time(&mut self, end_time: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.end_time = Some(end_time.into());
        self
    }

    /// Sets the time taken for the whole run.
    pub fn set_duration(&mut self, duration: Duration) -> &mut Self {
        self.duration = Some(duration);
        self
    }

    /// Adds a property to this run.
    pub fn add_property(&mut self, property: impl Into<Property>) -> &mut Self {
        self.properties.push(property.into());
        self
    }

    /// Adds a top-level suite and rolls its counters up into the run.
    ///
    /// When generating a new report, use of this method is recommended over
    /// adding to `self.suites` directly.
    pub fn add_suite(&mut self, suite: TestSuite) -> &mut Self {
        self.total += suite.total;
        self.passed += suite.passed;
        self.failed += suite.failed;
        self.warnings += suite.warnings;
        self.inconclusive += suite.inconclusive;
        self.skipped += suite.skipped;
        self.asserts += suite.asserts;
        self.suites.push(suite);
        self
    }

    /// Adds several top-level suites and rolls their counters up.
    pub fn add_suites(&mut self, suites: impl IntoIterator<Item = TestSuite>) -> &mut Self {
        for suite in suites {
            self.add_suite(suite);
        }
        self
    }

    /// Computes the rolled-up result over the top-level suites.
    ///
    /// A pure function of the children's stored results, following the
    /// precedence Failed > Warning > Passed > Skipped > Inconclusive. An
    /// empty run is Inconclusive.
    pub fn roll_up_result(&self) -> TestResult {
        self.suites
            .iter()
            .map(|suite| suite.result)
            .max()
            .unwrap_or(TestResult::Inconclusive)
    }

    /// Serialize this report to the given writer.
    pub fn serialize(&self, writer: impl io::Write) -> Result<(), SerializeError> {
        serialize_report(self, writer)
    }

    /// Serialize this report to a string.
    #[allow(clippy::inherent_to_string)]
    pub fn to_string(&self) -> Result<String, SerializeError> {
        let mut buf: Vec<u8> = vec![];
        self.serialize(&mut buf)?;
        String::from_utf8(buf).map_err(|utf8_err| {
            SerializeError::Io(io::Error::new(io::ErrorKind::InvalidData, utf8_err))
        })
    }
}

/// A grouping node in the report hierarchy: an assembly, a fixture, a module
/// or any other collection of tests.
///
/// A `TestSuite` owns its child suites and cases exclusively; nodes are never
/// removed once added.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct TestSuite {
    /// The id of this suite, unique within the run.
    pub id: String,

    /// The name of this suite.
    pub name: String,

    /// The full dotted path of this suite. Suite identity is by full path.
    pub fullname: String,

    /// The kind of grouping this suite represents.
    pub suite_type: SuiteType,

    /// Whether this suite was runnable.
    pub run_state: RunState,

    /// The rolled-up result of this suite.
    pub result: TestResult,

    /// Where a rolled-up failure originated, if not in the suite itself.
    pub site: Option<FailureSite>,

    /// A free-form label qualifying the result (e.g. `Error`).
    pub label: Option<String>,

    /// The total number of test cases under this suite, recursively.
    pub total: usize,

    /// The number of passed test cases.
    pub passed: usize,

    /// The number of failed test cases (including errors).
    pub failed: usize,

    /// The number of test cases that ended with a warning.
    pub warnings: usize,

    /// The number of inconclusive test cases.
    pub inconclusive: usize,

    /// The number of skipped test cases.
    pub skipped: usize,

    /// The total number of assertions under this suite.
    pub asserts: usize,

    /// The time at which the suite began execution.
    pub start_time: Option<DateTime<FixedOffset>>,

    /// The time at which the suite finished execution.
    pub end_time: Option<DateTime<FixedOffset>>,

    /// The overall time taken by the suite.
    pub duration: Option<Duration>,

    /// Child suites, in first-seen order.
    pub suites: Vec<TestSuite>,

    /// Child cases, in first-seen order.
    pub cases: Vec<TestCase>,

    /// Custom properties attached to the suite.
    pub properties: Vec<Property>,

    /// Output captured at the suite level.
    pub output: Option<Output>,

    /// A failure payload for suite-level failures (e.g. a fixture error).
    pub failure: Option<Failure>,

    /// A reason for not running the suite.
    pub reason: Option<String>,

    /// Extension attributes, carried through in lax mode.
    pub extra: IndexMap<String, String>,
}

impl TestSuite {
    /// Creates a new `TestSuite`.
    pub fn new(
        name: impl Into<String>,
        fullname: impl Into<String>,
        suite_type: SuiteType,
    ) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            fullname: fullname.into(),
            suite_type,
            run_state: RunState::Runnable,
            result: TestResult::Inconclusive,
            site: None,
            label: None,
            total: 0,
            passed: 0,
            failed: 0,
            warnings: 0,
            inconclusive: 0,
            skipped: 0,
            asserts: 0,
            start_time: None,
            end_time: None,
            duration: None,
            suites: vec![],
            cases: vec![],
            properties: vec![],
            output: None,
            failure: None,
            reason: None,
            extra: IndexMap::new(),
        }
    }

    /// Sets the id of the suite.
    pub fn set_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = id.into();
        self
    }

    /// Sets the run state of the suite.
    pub fn set_run_state(&mut self, run_state: RunState) -> &mut Self {
        self.run_state = run_state;
        self
    }

    /// Sets the start timestamp for the suite.
    pub fn set_start_time(&mut self, start_time: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.start_time = Some(start_time.into());
        self
    }

    /// Sets the end timestamp for the suite.
    pub fn set_end_time(&mut self, end_time: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.end_time = Some(end_time.into());
        self
    }

    /// Sets the time taken for the suite.
    pub fn set_duration(&mut self, duration: Duration) -> &mut Self {
        self.duration = Some(duration);
        self
    }

    /// Adds a property to this suite.
    pub fn add_property(&mut self, property: impl Into<Property>) -> &mut Self {
        self.properties.push(property.into());
        self
    }

    /// Adds several properties to this suite.
    pub fn add_properties(
        &mut self,
        properties: impl IntoIterator<Item = impl Into<Property>>,
    ) -> &mut Self {
        for property in properties {
            self.add_property(property);
        }
        self
    }

    /// Sets captured output for the suite. The text is sanitized.
    pub fn set_output(&mut self, output: impl AsRef<str>) -> &mut Self {
        self.output = Some(Output::new(output.as_ref()));
        self
    }

    /// Adds a child suite and rolls its counters up into this suite.
    ///
    /// When generating a new report, use of this method is recommended over
    /// adding to `self.suites` directly.
    pub fn add_suite(&mut self, suite: TestSuite) -> &mut Self {
        self.total += suite.total;
        self.passed += suite.passed;
        self.failed += suite.failed;
        self.warnings += suite.warnings;
        self.inconclusive += suite.inconclusive;
        self.skipped += suite.skipped;
        self.asserts += suite.asserts;
        self.suites.push(suite);
        self
    }

    /// Adds a test case and updates the counter bucket matching its result.
    ///
    /// When generating a new report, use of this method is recommended over
    /// adding to `self.cases` directly.
    pub fn add_test_case(&mut self, case: TestCase) -> &mut Self {
        self.total += 1;
        match case.result {
            TestResult::Passed => self.passed += 1,
            TestResult::Failed => self.failed += 1,
            TestResult::Warning => self.warnings += 1,
            TestResult::Skipped => self.skipped += 1,
            TestResult::Inconclusive => self.inconclusive += 1,
        }
        self.asserts += case.asserts;
        self.cases.push(case);
        self
    }

    /// Adds several test cases and updates the counts.
    pub fn add_test_cases(&mut self, cases: impl IntoIterator<Item = TestCase>) -> &mut Self {
        for case in cases {
            self.add_test_case(case);
        }
        self
    }

    /// Computes the rolled-up result over the direct children.
    ///
    /// A pure function of the children's stored results, following the
    /// precedence Failed > Warning > Passed > Skipped > Inconclusive. An
    /// empty suite is Inconclusive.
    pub fn roll_up_result(&self) -> TestResult {
        self.suites
            .iter()
            .map(|suite| suite.result)
            .chain(self.cases.iter().map(|case| case.result))
            .max()
            .unwrap_or(TestResult::Inconclusive)
    }
}

/// A single test's result record.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct TestCase {
    /// The stable unique id of the test, as reported by the host runner.
    pub id: String,

    /// The name of the test.
    pub name: String,

    /// The fully qualified name of the test. Defaults to the name.
    pub fullname: String,

    /// The class (or module) the test belongs to.
    pub classname: Option<String>,

    /// The method (or function) implementing the test.
    pub methodname: Option<String>,

    /// The per-test random seed, if the host reported one.
    pub seed: Option<u64>,

    /// Whether the test was runnable.
    pub run_state: RunState,

    /// The terminal result of the test.
    pub result: TestResult,

    /// The lifecycle phase where a failure originated.
    pub site: Option<FailureSite>,

    /// A free-form label qualifying the result (e.g. `Error`).
    pub label: Option<String>,

    /// The number of assertions executed by the test.
    pub asserts: usize,

    /// The time at which the test began execution.
    pub start_time: Option<DateTime<FixedOffset>>,

    /// The time at which the test finished execution.
    pub end_time: Option<DateTime<FixedOffset>>,

    /// The time taken by the test, across all lifecycle phases.
    pub duration: Option<Duration>,

    /// Output captured while the test ran.
    pub output: Option<Output>,

    /// The failure payload, present when the result is Failed.
    pub failure: Option<Failure>,

    /// The reason the test was skipped or left inconclusive.
    pub reason: Option<String>,

    /// Custom properties attached to the case.
    pub properties: Vec<Property>,

    /// Extension attributes, carried through in lax mode.
    pub extra: IndexMap<String, String>,
}

impl TestCase {
    /// Creates a new `TestCase` with an Inconclusive result.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            fullname: name.clone(),
            name,
            classname: None,
            methodname: None,
            seed: None,
            run_state: RunState::Runnable,
            result: TestResult::Inconclusive,
            site: None,
            label: None,
            asserts: 0,
            start_time: None,
            end_time: None,
            duration: None,
            output: None,
            failure: None,
            reason: None,
            properties: vec![],
            extra: IndexMap::new(),
        }
    }

    /// Sets the fully qualified name of the test.
    pub fn set_fullname(&mut self, fullname: impl Into<String>) -> &mut Self {
        self.fullname = fullname.into();
        self
    }

    /// Sets the classname of the test.
    pub fn set_classname(&mut self, classname: impl Into<String>) -> &mut Self {
        self.classname = Some(classname.into());
        self
    }

    /// Sets the methodname of the test.
    pub fn set_methodname(&mut self, methodname: impl Into<String>) -> &mut Self {
        self.methodname = Some(methodname.into());
        self
    }

    /// Sets the per-test random seed.
    pub fn set_seed(&mut self, seed: u64) -> &mut Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the terminal result of the test.
    pub fn set_result(&mut self, result: TestResult) -> &mut Self {
        self.result = result;
        self
    }

    /// Sets the failure site.
    pub fn set_site(&mut self, site: FailureSite) -> &mut Self {
        self.site = Some(site);
        self
    }

    /// Sets the run state of the test.
    pub fn set_run_state(&mut self, run_state: RunState) -> &mut Self {
        self.run_state = run_state;
        self
    }

    /// Sets the number of assertions executed by the test.
    pub fn set_asserts(&mut self, asserts: usize) -> &mut Self {
        self.asserts = asserts;
        self
    }

    /// Sets the start timestamp for the test.
    pub fn set_start_time(&mut self, start_time: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.start_time = Some(start_time.into());
        self
    }

    /// Sets the end timestamp for the test.
    pub fn set_end_time(&mut self, end_time: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.end_time = Some(end_time.into());
        self
    }

    /// Sets the time taken for the test.
    pub fn set_duration(&mut self, duration: Duration) -> &mut Self {
        self.duration = Some(duration);
        self
    }

    /// Sets captured output. The text is sanitized.
    pub fn set_output(&mut self, output: impl AsRef<str>) -> &mut Self {
        self.output = Some(Output::new(output.as_ref()));
        self
    }

    /// Sets captured output from a `Vec<u8>`, converting lossily.
    pub fn set_output_lossy(&mut self, output: impl AsRef<[u8]>) -> &mut Self {
        self.set_output(String::from_utf8_lossy(output.as_ref()))
    }

    /// Sets the failure payload.
    pub fn set_failure(&mut self, failure: Failure) -> &mut Self {
        self.failure = Some(failure);
        self
    }

    /// Sets the skip or inconclusive reason.
    pub fn set_reason(&mut self, reason: impl Into<String>) -> &mut Self {
        self.reason = Some(reason.into());
        self
    }

    /// Adds a property to this case.
    pub fn add_property(&mut self, property: impl Into<Property>) -> &mut Self {
        self.properties.push(property.into());
        self
    }
}

/// The result of a test case, suite or run.
///
/// The variant order is the roll-up precedence: a suite's result is the
/// maximum over its children, so Failed beats Warning beats Passed beats
/// Skipped beats Inconclusive.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TestResult {
    /// The outcome could not be determined.
    Inconclusive,

    /// The test was not run.
    Skipped,

    /// The test passed.
    Passed,

    /// The test passed with a warning.
    Warning,

    /// The test failed, or errored before it could fail.
    Failed,
}

impl TestResult {
    /// Returns the schema lexical form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestResult::Inconclusive => "Inconclusive",
            TestResult::Skipped => "Skipped",
            TestResult::Passed => "Passed",
            TestResult::Warning => "Warning",
            TestResult::Failed => "Failed",
        }
    }
}

impl FromStr for TestResult {
    type Err = SchemaMismatch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Inconclusive" => Ok(TestResult::Inconclusive),
            "Skipped" => Ok(TestResult::Skipped),
            "Passed" => Ok(TestResult::Passed),
            "Warning" => Ok(TestResult::Warning),
            "Failed" => Ok(TestResult::Failed),
            other => Err(SchemaMismatch::new("result", other)),
        }
    }
}

/// The lifecycle phase where a failure originated.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FailureSite {
    /// The test body itself.
    Test,

    /// Setup for the test.
    SetUp,

    /// Teardown for the test.
    TearDown,

    /// A parent suite's fixture.
    Parent,

    /// A child of this node.
    Child,
}

impl FailureSite {
    /// Returns the schema lexical form.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureSite::Test => "Test",
            FailureSite::SetUp => "SetUp",
            FailureSite::TearDown => "TearDown",
            FailureSite::Parent => "Parent",
            FailureSite::Child => "Child",
        }
    }
}

impl FromStr for FailureSite {
    type Err = SchemaMismatch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Test" => Ok(FailureSite::Test),
            "SetUp" => Ok(FailureSite::SetUp),
            "TearDown" => Ok(FailureSite::TearDown),
            "Parent" => Ok(FailureSite::Parent),
            "Child" => Ok(FailureSite::Child),
            other => Err(SchemaMismatch::new("site", other)),
        }
    }
}

/// Whether a test or suite could be run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RunState {
    /// The node could not be run.
    NotRunnable,

    /// The node was runnable.
    Runnable,

    /// The node runs only when selected explicitly.
    Explicit,

    /// The node was skipped.
    Skipped,

    /// The node was ignored.
    Ignored,
}

impl RunState {
    /// Returns the schema lexical form.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::NotRunnable => "NotRunnable",
            RunState::Runnable => "Runnable",
            RunState::Explicit => "Explicit",
            RunState::Skipped => "Skipped",
            RunState::Ignored => "Ignored",
        }
    }
}

impl FromStr for RunState {
    type Err = SchemaMismatch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NotRunnable" => Ok(RunState::NotRunnable),
            "Runnable" => Ok(RunState::Runnable),
            "Explicit" => Ok(RunState::Explicit),
            "Skipped" => Ok(RunState::Skipped),
            "Ignored" => Ok(RunState::Ignored),
            other => Err(SchemaMismatch::new("runstate", other)),
        }
    }
}

/// The kind of grouping a suite represents.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SuiteType {
    GenericFixture,
    ParameterizedFixture,
    Theory,
    GenericMethod,
    ParameterizedMethod,
    Assembly,
    SetUpFixture,
    TestFixture,
    TestMethod,
    TestSuite,
}

impl SuiteType {
    /// Returns the schema lexical form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SuiteType::GenericFixture => "GenericFixture",
            SuiteType::ParameterizedFixture => "ParameterizedFixture",
            SuiteType::Theory => "Theory",
            SuiteType::GenericMethod => "GenericMethod",
            SuiteType::ParameterizedMethod => "ParameterizedMethod",
            SuiteType::Assembly => "Assembly",
            SuiteType::SetUpFixture => "SetUpFixture",
            SuiteType::TestFixture => "TestFixture",
            SuiteType::TestMethod => "TestMethod",
            SuiteType::TestSuite => "TestSuite",
        }
    }
}

impl FromStr for SuiteType {
    type Err = SchemaMismatch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GenericFixture" => Ok(SuiteType::GenericFixture),
            "ParameterizedFixture" => Ok(SuiteType::ParameterizedFixture),
            "Theory" => Ok(SuiteType::Theory),
            "GenericMethod" => Ok(SuiteType::GenericMethod),
            "ParameterizedMethod" => Ok(SuiteType::ParameterizedMethod),
            "Assembly" => Ok(SuiteType::Assembly),
            "SetUpFixture" => Ok(SuiteType::SetUpFixture),
            "TestFixture" => Ok(SuiteType::TestFixture),
            "TestMethod" => Ok(SuiteType::TestMethod),
            "TestSuite" => Ok(SuiteType::TestSuite),
            other => Err(SchemaMismatch::new("suite type", other)),
        }
    }
}

/// The payload of a `failure` element: a short message and a stack trace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Failure {
    /// The failure message.
    pub message: Option<String>,

    /// The stack trace, if any.
    pub stack_trace: Option<String>,
}

impl Failure {
    /// Creates a new `Failure` with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            stack_trace: None,
        }
    }

    /// Sets the stack trace.
    pub fn set_stack_trace(&mut self, stack_trace: impl Into<String>) -> &mut Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }
}

/// A custom name/value pair attached to a run, suite or case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    /// The name of the property.
    pub name: String,

    /// The value of the property.
    pub value: String,
}

impl Property {
    /// Creates a new `Property` instance.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<T> From<(T, T)> for Property
where
    T: Into<String>,
{
    fn from((k, v): (T, T)) -> Self {
        Property::new(k, v)
    }
}

/// Text captured from a test while it ran.
///
/// The schema assumes output is valid Unicode, so non-printable control
/// characters and ANSI escape sequences are removed on construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Output {
    output: Box<str>,
}

impl Output {
    /// Creates a new output, removing ANSI escapes and non-printable
    /// characters from it.
    pub fn new(output: impl AsRef<str>) -> Self {
        let output = strip_ansi_escapes::strip_str(output.as_ref())
            .replace(
                |c| matches!(c, '\x00'..='\x08' | '\x0b' | '\x0c' | '\x0e'..='\x1f'),
                "",
            )
            .into_boxed_str();
        Self { output }
    }

    /// Returns the output.
    pub fn as_str(&self) -> &str {
        &self.output
    }

    /// Converts the output into a string.
    pub fn into_string(self) -> String {
        self.output.into_string()
    }
}

impl AsRef<str> for Output {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<Output> for String {
    fn from(output: Output) -> Self {
        output.into_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: &str, result: TestResult) -> TestCase {
        let mut case = TestCase::new(id, id);
        case.set_result(result);
        case
    }

    #[test]
    fn result_precedence_order() {
        assert!(TestResult::Failed > TestResult::Warning);
        assert!(TestResult::Warning > TestResult::Passed);
        assert!(TestResult::Passed > TestResult::Skipped);
        assert!(TestResult::Skipped > TestResult::Inconclusive);
    }

    #[test]
    fn roll_up_precedence() {
        let mut suite = TestSuite::new("s", "s", SuiteType::TestFixture);
        suite.add_test_case(case("a", TestResult::Passed));
        suite.add_test_case(case("b", TestResult::Failed));
        assert_eq!(suite.roll_up_result(), TestResult::Failed);

        let mut suite = TestSuite::new("s", "s", SuiteType::TestFixture);
        suite.add_test_case(case("a", TestResult::Warning));
        suite.add_test_case(case("b", TestResult::Passed));
        assert_eq!(suite.roll_up_result(), TestResult::Warning);

        let mut suite = TestSuite::new("s", "s", SuiteType::TestFixture);
        suite.add_test_case(case("a", TestResult::Skipped));
        suite.add_test_case(case("b", TestResult::Skipped));
        assert_eq!(suite.roll_up_result(), TestResult::Skipped);

        let suite = TestSuite::new("s", "s", SuiteType::TestFixture);
        assert_eq!(suite.roll_up_result(), TestResult::Inconclusive);
    }

    #[test]
    fn counters_sum_across_nesting() {
        let mut inner = TestSuite::new("inner", "outer.inner", SuiteType::TestFixture);
        inner.add_test_case(case("a", TestResult::Passed));
        inner.add_test_case(case("b", TestResult::Failed));
        inner.add_test_case(case("c", TestResult::Skipped));
        inner.result = inner.roll_up_result();

        let mut outer = TestSuite::new("outer", "outer", SuiteType::Assembly);
        outer.add_suite(inner);
        outer.add_test_case(case("d", TestResult::Inconclusive));
        outer.result = outer.roll_up_result();

        assert_eq!(outer.total, 4);
        assert_eq!(
            outer.total,
            outer.passed + outer.failed + outer.skipped + outer.inconclusive + outer.warnings
        );
        assert_eq!(outer.result, TestResult::Failed);

        let mut run = TestRun::new("run");
        run.add_suite(outer);
        assert_eq!(run.total, 4);
        assert_eq!(run.passed, 1);
        assert_eq!(run.failed, 1);
        assert_eq!(run.skipped, 1);
        assert_eq!(run.inconclusive, 1);
    }

    #[test]
    fn output_strips_control_and_ansi() {
        let output = Output::new("be\x07fore \x1b[1;31mred\x1b[0m after\n");
        assert_eq!(output.as_str(), "before red after\n");
    }
}
