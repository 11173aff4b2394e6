//! The assertion recorder handed to Setup, TearDown, and every test step.
use super::results::{AssertionOutcome, TestResult};
use crate::{
    clock::Clock,
    exception::{Outcome, Raise},
    trace::TraceConfig,
};
use std::{fmt, panic::Location, time::Duration};

/// Explicit per-call context: the running test's result, the clock of the
/// current variant, and trace settings.
///
/// Every assertion funnels through one check. A pass bumps the assertion
/// count. A failure bumps both counters, records an [`AssertionOutcome`]
/// with a trace, and returns [`Raise::FailFast`] so `?` ends the current
/// step. After a failure every further assertion in the same phase returns
/// `FailFast` again without being counted.
pub struct Context<'a> {
    result: &'a mut TestResult,
    halted: &'a mut bool,
    clock: &'a Clock,
    trace: &'a TraceConfig,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        result: &'a mut TestResult,
        halted: &'a mut bool,
        clock: &'a Clock,
        trace: &'a TraceConfig,
    ) -> Self {
        Self {
            result,
            halted,
            clock,
            trace,
        }
    }

    /// Name of the running test method.
    pub fn method_id(&self) -> &str {
        self.result.method_id()
    }

    /// The result being recorded, as it stands right now.
    pub fn result(&self) -> &TestResult {
        self.result
    }

    pub fn clock(&self) -> &Clock {
        self.clock
    }

    /// Simulated time of the current variant.
    pub fn time(&self) -> Duration {
        self.clock.time()
    }

    /// Length of the last tick.
    pub fn delta(&self) -> Duration {
        self.clock.delta()
    }

    pub fn frame(&self) -> u64 {
        self.clock.frame()
    }

    /// Record a failure raised outside an assertion (uncaught exceptions,
    /// reconciliation). Does not stop the current phase.
    pub(crate) fn record(&mut self, outcome: AssertionOutcome) {
        self.result.record_failure(outcome);
    }

    #[track_caller]
    fn check(
        &mut self,
        condition: bool,
        message: impl FnOnce() -> String,
        mismatch: Option<(String, String)>,
    ) -> Outcome {
        if *self.halted {
            return Err(Raise::FailFast);
        }
        if condition {
            self.result.record_pass();
            return Ok(());
        }

        let message = message();
        tracing::debug!(
            method = self.result.method_id(),
            %message,
            "assertion failed"
        );
        let trace = self.trace.capture(Location::caller());
        let mut outcome = AssertionOutcome::failure(message, Some(trace), None);
        if let Some((expected, actual)) = mismatch {
            outcome = outcome.with_mismatch(&expected, &actual);
        }
        self.result.record_failure(outcome);
        *self.halted = true;
        Err(Raise::FailFast)
    }

    #[track_caller]
    pub fn assert_true(&mut self, condition: bool) -> Outcome {
        self.check(condition, || "Expected true, got false".to_string(), None)
    }

    #[track_caller]
    pub fn assert_true_msg(&mut self, condition: bool, msg: &str) -> Outcome {
        self.check(condition, || msg.to_string(), None)
    }

    #[track_caller]
    pub fn assert_false(&mut self, condition: bool) -> Outcome {
        self.check(!condition, || "Expected false, but got true".to_string(), None)
    }

    #[track_caller]
    pub fn assert_false_msg(&mut self, condition: bool, msg: &str) -> Outcome {
        self.check(!condition, || msg.to_string(), None)
    }

    /// Record an unconditional failure.
    #[track_caller]
    pub fn fail(&mut self) -> Outcome {
        self.check(false, || "Unexpected condition".to_string(), None)
    }

    #[track_caller]
    pub fn fail_msg(&mut self, msg: &str) -> Outcome {
        self.check(false, || msg.to_string(), None)
    }

    #[track_caller]
    pub fn assert_not_null<T>(&mut self, value: Option<T>) -> Outcome {
        self.check(
            value.is_some(),
            || "Expected non-null value, but got null.".to_string(),
            None,
        )
    }

    #[track_caller]
    pub fn assert_not_null_msg<T>(&mut self, value: Option<T>, msg: &str) -> Outcome {
        self.check(value.is_some(), || msg.to_string(), None)
    }

    #[track_caller]
    pub fn assert_null<T: fmt::Debug>(&mut self, value: Option<T>) -> Outcome {
        let message = match &value {
            Some(inner) => format!("Expected null, but got: {:?}", inner),
            None => String::new(),
        };
        self.check(value.is_none(), || message, None)
    }

    #[track_caller]
    pub fn assert_null_msg<T>(&mut self, value: Option<T>, msg: &str) -> Outcome {
        self.check(value.is_none(), || msg.to_string(), None)
    }

    /// Compare two scalars or strings. Multi-line values keep both
    /// renderings so the reporter can show a line diff.
    #[track_caller]
    pub fn assert_equal<T>(&mut self, expected: T, actual: T) -> Outcome
    where
        T: PartialEq + fmt::Display,
    {
        let expected_str = expected.to_string();
        let actual_str = actual.to_string();
        let message = format!("Expected {}, but got {}", expected_str, actual_str);
        self.compare(expected == actual, message, expected_str, actual_str)
    }

    #[track_caller]
    pub fn assert_equal_msg<T>(&mut self, expected: T, actual: T, msg: &str) -> Outcome
    where
        T: PartialEq + fmt::Display,
    {
        let (expected_str, actual_str) = (expected.to_string(), actual.to_string());
        self.compare(expected == actual, msg.to_string(), expected_str, actual_str)
    }

    #[track_caller]
    fn compare(
        &mut self,
        equal: bool,
        message: String,
        expected: String,
        actual: String,
    ) -> Outcome {
        let mismatch = (expected.contains('\n') || actual.contains('\n'))
            .then_some((expected, actual));
        self.check(equal, || message, mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_context<R>(body: impl FnOnce(&mut Context) -> R) -> (TestResult, bool, R) {
        let mut result = TestResult::new("Suite", "TestThing");
        let mut halted = false;
        let clock = Clock::default();
        let trace = TraceConfig::default();
        let out = {
            let mut ctx = Context::new(&mut result, &mut halted, &clock, &trace);
            body(&mut ctx)
        };
        (result, halted, out)
    }

    #[test]
    fn passes_are_counted_not_logged() {
        let (result, halted, out) = with_context(|ctx| -> Outcome {
            ctx.assert_true(true)?;
            ctx.assert_equal(3, 1 + 2)?;
            ctx.assert_equal("a", "a")?;
            ctx.assert_null::<u8>(None)?;
            ctx.assert_not_null(Some(1.5))
        });
        assert!(out.is_ok());
        assert!(!halted);
        assert_eq!(result.assertion_count(), 5);
        assert_eq!(result.failure_count(), 0);
        assert!(result.messages().is_empty());
    }

    #[test]
    fn first_failure_stops_counting() {
        let (result, halted, _) = with_context(|ctx| {
            let first = ctx.assert_equal(2_i64, 3);
            let second = ctx.assert_true(false);
            let third = ctx.assert_true(true);
            (first, second, third)
        });
        assert!(halted);
        assert_eq!(result.assertion_count(), 1);
        assert_eq!(result.failure_count(), 1);
        assert_eq!(result.messages()[0].message(), "Expected 2, but got 3");
        assert!(result.messages()[0]
            .captured_trace()
            .unwrap()
            .contains("context.rs"));
    }

    #[test]
    fn default_messages() {
        let (result, _, _) = with_context(|ctx| ctx.assert_null(Some("x")));
        assert_eq!(result.messages()[0].message(), "Expected null, but got: \"x\"");
        let (result, _, _) = with_context(|ctx| ctx.fail());
        assert_eq!(result.messages()[0].message(), "Unexpected condition");
        let (result, _, _) = with_context(|ctx| ctx.assert_false_msg(true, "custom"));
        assert_eq!(result.messages()[0].message(), "custom");
    }

    #[test]
    fn multiline_strings_keep_a_mismatch() {
        let (result, _, _) =
            with_context(|ctx| ctx.assert_equal("a\nb", "a\nc"));
        assert_eq!(result.messages()[0].mismatch(), Some(("a\nb", "a\nc")));
    }
}
