use crate::{cli, exception::Exception, printer};

/// One recorded check. Only failures are kept in a test's message log;
/// passes are just counted.
#[derive(Debug, Clone)]
pub struct AssertionOutcome {
    passed: bool,
    message: String,
    captured_trace: Option<String>,
    captured_exception: Option<Exception>,
    /// Expected and actual text of a failed string comparison.
    mismatch: Option<(String, String)>,
}

impl AssertionOutcome {
    pub fn failure(
        message: impl Into<String>,
        captured_trace: Option<String>,
        captured_exception: Option<Exception>,
    ) -> Self {
        Self {
            passed: false,
            message: message.into(),
            captured_trace,
            captured_exception,
            mismatch: None,
        }
    }

    pub(crate) fn with_mismatch(mut self, expected: &str, actual: &str) -> Self {
        self.mismatch = Some((expected.to_string(), actual.to_string()));
        self
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn captured_trace(&self) -> Option<&str> {
        self.captured_trace.as_deref()
    }

    pub fn captured_exception(&self) -> Option<&Exception> {
        self.captured_exception.as_ref()
    }

    pub fn mismatch(&self) -> Option<(&str, &str)> {
        self.mismatch
            .as_ref()
            .map(|(expected, actual)| (expected.as_str(), actual.as_str()))
    }
}

/// Coarse state of a test, used for reporting and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// The test (or its TearDown) has not finished yet.
    Running,
    /// Finished without failures.
    Passed,
    /// Finished with at least one failure.
    Failed,
}

/// Store information related to one run of one test method.
#[derive(Debug, Clone)]
pub struct TestResult {
    suite_id: String,
    method_id: String,
    messages: Vec<AssertionOutcome>,
    is_running: bool,
    assertion_count: u32,
    failure_count: u32,
}

impl TestResult {
    pub fn new(suite_id: impl Into<String>, method_id: impl Into<String>) -> Self {
        Self {
            suite_id: suite_id.into(),
            method_id: method_id.into(),
            messages: Vec::new(),
            is_running: true,
            assertion_count: 0,
            failure_count: 0,
        }
    }

    pub fn suite_id(&self) -> &str {
        &self.suite_id
    }

    pub fn method_id(&self) -> &str {
        &self.method_id
    }

    /// Failures recorded so far, in order.
    pub fn messages(&self) -> &[AssertionOutcome] {
        &self.messages
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn assertion_count(&self) -> u32 {
        self.assertion_count
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn passed(&self) -> bool {
        self.failure_count == 0
    }

    pub fn state(&self) -> State {
        if self.is_running {
            State::Running
        } else if self.passed() {
            State::Passed
        } else {
            State::Failed
        }
    }

    pub(crate) fn record_pass(&mut self) {
        self.assertion_count += 1;
    }

    pub(crate) fn record_failure(&mut self, outcome: AssertionOutcome) {
        self.assertion_count += 1;
        self.failure_count += 1;
        self.messages.push(outcome);
    }

    /// Mark the test finished. Happens exactly once, after TearDown.
    pub(crate) fn done(&mut self) {
        debug_assert!(self.is_running, "test result finished twice");
        self.is_running = false;
    }

    /// Returns true if this test should be printed with the current options.
    pub fn should_print(&self, opts: &cli::Opts) -> bool {
        use cli::OnlyOpt as O;
        if let Some(only) = &opts.post_filter {
            return matches!(
                (only, self.state()),
                (O::Fail, State::Failed) | (O::Pass, State::Passed)
            );
        }
        opts.verbose || self.state() != State::Passed
    }

    /// Generate colorized string to report the results of this test.
    pub fn report_str(&self, show_diff: bool) -> String {
        use colored::*;

        let mut buf = String::new();
        match self.state() {
            State::Running => {
                buf.push_str(&"… ".yellow().to_string());
                buf.push_str(&self.method_id.yellow().to_string());
                buf.push_str(&" (running)".dimmed().to_string());
            }
            State::Passed => {
                buf.push_str(&"✓ ".green().to_string());
                buf.push_str(&self.method_id.green().to_string());
                buf.push_str(
                    &format!(" ({} assertions)", self.assertion_count)
                        .dimmed()
                        .to_string(),
                );
            }
            State::Failed => {
                buf.push_str(&"✗ ".red().to_string());
                buf.push_str(&self.method_id.red().to_string());
                buf.push_str(
                    &format!(
                        " ({}/{} assertions failed)",
                        self.failure_count, self.assertion_count
                    )
                    .dimmed()
                    .to_string(),
                );
            }
        }

        for outcome in &self.messages {
            buf.push_str("\n    ");
            buf.push_str(&outcome.message.red().to_string());
            if let Some(exception) = &outcome.captured_exception {
                buf.push_str("\n      ");
                buf.push_str(&exception.to_string());
                if let Some(location) = exception.location() {
                    buf.push_str(&format!(" ({})", location).dimmed().to_string());
                }
            }
            if let Some(trace) = &outcome.captured_trace {
                for line in trace.lines() {
                    buf.push_str("\n      ");
                    buf.push_str(&line.trim_start().dimmed().to_string());
                }
            }
            if let (true, Some((expected, actual))) = (show_diff, &outcome.mismatch) {
                buf.push('\n');
                buf.push_str(&printer::gen_diff(expected, actual));
            }
        }
        buf
    }
}

/// Counters folded in as tests finish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub tests: u32,
    pub tests_failed: u32,
    pub assertions: u32,
    pub assertions_failed: u32,
}

impl Totals {
    pub fn add(&mut self, result: &TestResult) {
        self.tests += 1;
        if !result.passed() {
            self.tests_failed += 1;
        }
        self.assertions += result.assertion_count;
        self.assertions_failed += result.failure_count;
    }

    pub fn merge(&mut self, other: &Totals) {
        self.tests += other.tests;
        self.tests_failed += other.tests_failed;
        self.assertions += other.assertions;
        self.assertions_failed += other.assertions_failed;
    }
}

/// Results of running one suite under one pacing variant.
#[derive(Debug, Clone)]
pub struct SuiteResult {
    suite_id: String,
    variant: String,
    results: Vec<TestResult>,
    totals: Totals,
}

impl SuiteResult {
    pub fn new(suite_id: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            suite_id: suite_id.into(),
            variant: variant.into(),
            results: Vec::new(),
            totals: Totals::default(),
        }
    }

    pub fn suite_id(&self) -> &str {
        &self.suite_id
    }

    /// Pacing label, empty for the default pacing.
    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Suite name followed by the variant label, if any.
    pub fn title(&self) -> String {
        if self.variant.is_empty() {
            self.suite_id.clone()
        } else {
            format!("{} {}", self.suite_id, self.variant)
        }
    }

    /// Append a fresh result and return its index.
    pub(crate) fn begin(&mut self, method_id: &str) -> usize {
        self.results
            .push(TestResult::new(self.suite_id.clone(), method_id));
        self.results.len() - 1
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut TestResult> {
        self.results.get_mut(index)
    }

    /// Fold a finished result into the suite totals.
    pub(crate) fn accumulate(&mut self, index: usize) {
        if let Some(result) = self.results.get(index) {
            self.totals.add(result);
        }
    }

    /// Render this suite's header and the results selected by `opts`.
    pub fn report_str(&self, opts: &cli::Opts) -> String {
        use colored::*;

        let mut buf = String::with_capacity(500);
        buf.push_str(&format!(
            "{} ({} tests)\n",
            self.title().bold(),
            self.results.len()
        ));
        self.results
            .iter()
            .filter(|result| result.should_print(opts))
            .for_each(|result| {
                buf.push_str(&format!("  {}\n", result.report_str(opts.diff)));
            });
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_and_state() {
        let mut result = TestResult::new("Arith", "TestAdd");
        assert_eq!(result.state(), State::Running);
        result.record_pass();
        result.record_failure(AssertionOutcome::failure("nope", None, None));
        result.done();

        assert_eq!(result.assertion_count(), 2);
        assert_eq!(result.failure_count(), 1);
        assert_eq!(result.messages().len(), 1);
        assert_eq!(result.state(), State::Failed);
    }

    #[test]
    fn suite_totals_follow_accumulated_tests() {
        let mut suite = SuiteResult::new("Arith", "[@30 fps]");
        let a = suite.begin("TestA");
        suite.get_mut(a).unwrap().record_pass();
        suite.get_mut(a).unwrap().done();
        suite.accumulate(a);
        let b = suite.begin("TestB");
        suite
            .get_mut(b)
            .unwrap()
            .record_failure(AssertionOutcome::failure("bad", None, None));
        suite.get_mut(b).unwrap().done();
        suite.accumulate(b);

        assert_eq!(suite.title(), "Arith [@30 fps]");
        assert_eq!(
            suite.totals(),
            Totals {
                tests: 2,
                tests_failed: 1,
                assertions: 2,
                assertions_failed: 1,
            }
        );
    }

    #[test]
    fn report_mentions_failure_messages() {
        colored::control::set_override(false);
        let mut result = TestResult::new("Arith", "TestDiv");
        result.record_failure(AssertionOutcome::failure(
            "Expected 2, but got 3",
            Some("\tat tests/arith.rs:line 9\n".to_string()),
            None,
        ));
        result.done();
        let report = result.report_str(false);
        assert!(report.starts_with("✗ TestDiv"));
        assert!(report.contains("Expected 2, but got 3"));
        assert!(report.contains("at tests/arith.rs:line 9"));
    }
}
