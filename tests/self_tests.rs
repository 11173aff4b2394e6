//! The runner's own behaviour, checked by running suites through it.
mod common;

use common::{find, run_to_end};
use std::time::Duration;
use tickrun::{
    exception::{self, ERROR, NULL_REFERENCE},
    executor::State,
    Aggregator, Context, Outcome, Pacing, Raise, Step, Steps, Suite, TestMethod,
};

struct States {
    pause_for: Duration,
}

impl Suite for States {
    fn tests() -> Vec<TestMethod<Self>> {
        vec![
            TestMethod::new("test_pass_with_no_asserts", |_: &mut Self, _: &mut Context| {
                Steps::<Self>::new()
            }),
            TestMethod::new("test_pass_with_assert", |_: &mut Self, ctx: &mut Context| -> Outcome {
                ctx.assert_true_msg(true, "Truth is truth.")
            }),
            TestMethod::new("test_fail", |_: &mut Self, ctx: &mut Context| -> Outcome {
                ctx.fail_msg("Expected failure.")
            }),
            TestMethod::new("test_fail_with_assert", |_: &mut Self, ctx: &mut Context| -> Outcome {
                ctx.assert_true_msg(false, "False is not truth.")
            }),
            TestMethod::new("test_ongoing_then_pass", |s: &mut Self, _: &mut Context| {
                let pause_for = s.pause_for;
                Steps::new().then(move |_: &mut Self, _: &mut Context| Ok(Step::Wait(pause_for)))
            }),
        ]
    }
}

#[test]
fn states_are_reported() {
    let mut aggregator = Aggregator::new()
        .seed(3)
        .pacing(vec![Pacing::Fixed { fps: 10 }])
        .suite(States {
            pause_for: Duration::from_secs(5),
        });
    run_to_end(&mut aggregator, Duration::ZERO);
    let suite = &aggregator.results()[0];

    assert_eq!(find(suite, "test_pass_with_no_asserts").state(), State::Passed);
    assert_eq!(find(suite, "test_pass_with_no_asserts").assertion_count(), 0);
    assert_eq!(find(suite, "test_pass_with_assert").state(), State::Passed);
    assert_eq!(find(suite, "test_ongoing_then_pass").state(), State::Passed);

    let fail = find(suite, "test_fail");
    assert_eq!(fail.state(), State::Failed);
    assert_eq!(fail.messages()[0].message(), "Expected failure.");
    let fail = find(suite, "test_fail_with_assert");
    assert_eq!(fail.messages()[0].message(), "False is not truth.");

    assert_eq!(suite.totals().tests, 5);
    assert_eq!(suite.totals().tests_failed, 2);
}

#[test]
fn waiting_test_stays_running_until_its_time_is_up() {
    let mut aggregator = Aggregator::new()
        .seed(3)
        .pacing(vec![Pacing::Fixed { fps: 10 }])
        .filter(tickrun::picker::Filter::new(Some("ongoing"), None).unwrap())
        .suite(States {
            pause_for: Duration::from_secs(1),
        });

    let mut ticks = 0;
    loop {
        aggregator.tick(Duration::ZERO).unwrap();
        ticks += 1;
        let result = &aggregator.results()[0].results()[0];
        if !result.is_running() {
            break;
        }
        assert!(ticks < 100, "test never finished");
    }
    // One second at ten frames per second.
    assert!((10..=12).contains(&ticks), "finished after {} ticks", ticks);
}

/// Every body raises without declaring it.
struct ExceptionHandling;

impl Suite for ExceptionHandling {
    fn tests() -> Vec<TestMethod<Self>> {
        vec![
            TestMethod::new(
                "test_fail_via_uncaught_exception_with_subsequent_step",
                |_: &mut Self, _: &mut Context| -> Result<Steps<Self>, Raise> {
                    exception::throw::<()>(&ERROR, "before the first step")?;
                    Ok(Steps::new().then(|_: &mut Self, _: &mut Context| Ok(Step::NextTick)))
                },
            ),
            TestMethod::new(
                "test_fail_via_uncaught_exception_with_preceding_step",
                |_: &mut Self, _: &mut Context| {
                    Steps::new()
                        .then(|_: &mut Self, _: &mut Context| Ok(Step::NextTick))
                        .then(|_: &mut Self, _: &mut Context| {
                            exception::throw(&ERROR, "after a step")
                        })
                },
            ),
            TestMethod::new(
                "test_fail_via_uncaught_exception_no_steps",
                |_: &mut Self, _: &mut Context| -> Result<Steps<Self>, Raise> {
                    exception::throw(&ERROR, "no steps at all")
                },
            ),
            TestMethod::new(
                "test_fail_via_uncaught_exception",
                |_: &mut Self, _: &mut Context| -> Outcome { exception::throw(&ERROR, "plain") },
            ),
            TestMethod::new("test_fail_via_panic", |_: &mut Self, _: &mut Context| {
                let values: Vec<u8> = Vec::new();
                let _fourth: u8 = values[3];
            }),
        ]
    }
}

#[test]
fn uncaught_exceptions_fail_exactly_once() {
    let mut aggregator = Aggregator::new()
        .seed(8)
        .pacing(vec![Pacing::Fixed { fps: 30 }])
        .suite(ExceptionHandling);
    run_to_end(&mut aggregator, Duration::ZERO);
    let suite = &aggregator.results()[0];

    assert_eq!(suite.results().len(), 5);
    for result in suite.results() {
        assert!(!result.is_running(), "{} still running", result.method_id());
        assert_eq!(result.failure_count(), 1, "{}", result.method_id());
        let message = &result.messages()[0];
        assert_eq!(message.message(), "Unexpected exception.");
        assert!(message.captured_exception().is_some());
    }
    let panicked = find(suite, "test_fail_via_panic").messages()[0]
        .captured_exception()
        .unwrap()
        .clone();
    assert_eq!(panicked.kind().name(), "Panic");
    assert!(panicked.location().unwrap().contains("self_tests.rs"));
}

/// Bodies that must raise to pass.
struct Overrides;

impl Suite for Overrides {
    fn tests() -> Vec<TestMethod<Self>> {
        vec![
            TestMethod::new(
                "test_pass_via_uncaught_exception_with_subsequent_step",
                |_: &mut Self, _: &mut Context| -> Result<Steps<Self>, Raise> {
                    exception::throw::<()>(&ERROR, "before the first step")?;
                    Ok(Steps::new().then(|_: &mut Self, _: &mut Context| Ok(Step::NextTick)))
                },
            )
            .should_throw_any(),
            TestMethod::new(
                "test_pass_via_uncaught_exception_with_preceding_step",
                |_: &mut Self, _: &mut Context| {
                    Steps::new()
                        .then(|_: &mut Self, _: &mut Context| Ok(Step::NextTick))
                        .then(|_: &mut Self, _: &mut Context| exception::throw(&ERROR, "late"))
                },
            )
            .should_throw_any(),
            TestMethod::new(
                "test_pass_via_uncaught_exception_no_steps",
                |_: &mut Self, _: &mut Context| -> Result<Steps<Self>, Raise> {
                    exception::throw(&ERROR, "no steps")
                },
            )
            .should_throw_any(),
            TestMethod::new(
                "test_fail_steps_via_uncaught_exception_of_wrong_type",
                |_: &mut Self, _: &mut Context| {
                    Steps::new()
                        .then(|_: &mut Self, _: &mut Context| Ok(Step::NextTick))
                        .then(|_: &mut Self, _: &mut Context| exception::throw(&ERROR, "late"))
                },
            )
            .should_throw(&NULL_REFERENCE),
            TestMethod::new("test_pass_via_uncaught_exception", |_: &mut Self, _: &mut Context| -> Outcome {
                exception::throw(&ERROR, "plain")
            })
            .should_throw_any(),
            TestMethod::new(
                "test_fail_method_via_uncaught_exception_of_wrong_type",
                |_: &mut Self, _: &mut Context| -> Outcome { exception::throw(&ERROR, "plain") },
            )
            .should_throw(&NULL_REFERENCE),
            TestMethod::new("test_fail_without_exception", |_: &mut Self, ctx: &mut Context| -> Outcome {
                ctx.assert_true(true)
            })
            .should_throw_any(),
        ]
    }
}

#[test]
fn declared_exceptions_are_reconciled() {
    let mut aggregator = Aggregator::new()
        .seed(21)
        .pacing(vec![Pacing::Fixed { fps: 30 }])
        .suite(Overrides);
    run_to_end(&mut aggregator, Duration::ZERO);
    let suite = &aggregator.results()[0];

    for name in [
        "test_pass_via_uncaught_exception_with_subsequent_step",
        "test_pass_via_uncaught_exception_with_preceding_step",
        "test_pass_via_uncaught_exception_no_steps",
        "test_pass_via_uncaught_exception",
    ] {
        let result = find(suite, name);
        assert!(result.passed(), "{} should pass", name);
        assert!(result.messages().is_empty());
    }

    for name in [
        "test_fail_steps_via_uncaught_exception_of_wrong_type",
        "test_fail_method_via_uncaught_exception_of_wrong_type",
    ] {
        let result = find(suite, name);
        assert_eq!(result.failure_count(), 1, "{}", name);
        assert_eq!(
            result.messages()[0].message(),
            "Expected one type of exception, but got another.  Expected one of: NullReferenceError"
        );
    }

    let missing = find(suite, "test_fail_without_exception");
    assert_eq!(
        missing.messages()[0].message(),
        "Expected an exception, but did not get one."
    );
    assert_eq!(missing.assertion_count(), 2);
}
