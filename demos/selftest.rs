//! Runs the runner's own demonstration suites from the command line:
//!
//! ```bash
//! cargo run --example selftest -- --pacing 0 --pacing 30 --verbose
//! ```
//!
//! Half of these tests fail on purpose; the point is to see every kind of
//! result in the report.
use std::time::Duration;
use tickrun::{
    exception::{self, DIVIDE_BY_ZERO, ERROR, NULL_REFERENCE},
    Aggregator, Context, Outcome, Raise, Step, Steps, Suite, TestMethod,
};

/// Pass, fail and in-progress results.
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
            TestMethod::new("test_fail_with_diff", |_: &mut Self, ctx: &mut Context| -> Outcome {
                ctx.assert_equal("alpha\nbeta\ngamma", "alpha\nbeta\ndelta")
            }),
            // Stays in the running state for a while so a viewer can see it.
            TestMethod::new("test_ongoing_then_pass", |s: &mut Self, _: &mut Context| {
                let pause_for = s.pause_for;
                Steps::new().then(move |_: &mut Self, _: &mut Context| Ok(Step::Wait(pause_for)))
            }),
        ]
    }
}

/// Undeclared exceptions, raised before, between and without steps.
struct ExceptionHandling;

impl Suite for ExceptionHandling {
    fn tests() -> Vec<TestMethod<Self>> {
        vec![
            TestMethod::new(
                "test_fail_via_uncaught_exception_with_subsequent_step",
                |_: &mut Self, _: &mut Context| -> Result<Steps<Self>, Raise> {
                    exception::throw::<()>(&ERROR, "raised before the first step")?;
                    Ok(Steps::new().then(|_: &mut Self, _: &mut Context| Ok(Step::NextTick)))
                },
            ),
            TestMethod::new(
                "test_fail_via_uncaught_exception_with_preceding_step",
                |_: &mut Self, _: &mut Context| {
                    Steps::new()
                        .then(|_: &mut Self, _: &mut Context| Ok(Step::NextTick))
                        .then(|_: &mut Self, _: &mut Context| {
                            exception::throw(&ERROR, "raised after a step")
                        })
                },
            ),
            TestMethod::new(
                "test_fail_via_uncaught_exception_no_steps",
                |_: &mut Self, _: &mut Context| -> Result<Steps<Self>, Raise> {
                    exception::throw(&ERROR, "raised instead of returning steps")
                },
            ),
            TestMethod::new("test_fail_via_uncaught_exception", |_: &mut Self, _: &mut Context| -> Outcome {
                exception::throw(&ERROR, "raised from a plain body")
            }),
            TestMethod::new("test_fail_via_panic", |_: &mut Self, _: &mut Context| {
                let divisor: i32 = "0".parse().unwrap_or(1);
                let _ = 10 / divisor;
            }),
        ]
    }
}

/// Bodies that only pass if they raise.
struct ExceptionHandlingOverrides;

impl Suite for ExceptionHandlingOverrides {
    fn tests() -> Vec<TestMethod<Self>> {
        vec![
            TestMethod::new(
                "test_pass_via_uncaught_exception_with_subsequent_step",
                |_: &mut Self, _: &mut Context| -> Result<Steps<Self>, Raise> {
                    exception::throw::<()>(&ERROR, "raised before the first step")?;
                    Ok(Steps::new().then(|_: &mut Self, _: &mut Context| Ok(Step::NextTick)))
                },
            )
            .should_throw_any(),
            TestMethod::new(
                "test_pass_via_uncaught_exception_with_preceding_step",
                |_: &mut Self, _: &mut Context| {
                    Steps::new()
                        .then(|_: &mut Self, _: &mut Context| Ok(Step::NextTick))
                        .then(|_: &mut Self, _: &mut Context| {
                            exception::throw(&DIVIDE_BY_ZERO, "raised after a step")
                        })
                },
            )
            .should_throw_any(),
            TestMethod::new(
                "test_pass_via_uncaught_exception_no_steps",
                |_: &mut Self, _: &mut Context| -> Result<Steps<Self>, Raise> {
                    exception::throw(&ERROR, "raised instead of returning steps")
                },
            )
            .should_throw_any(),
            TestMethod::new(
                "test_fail_steps_via_uncaught_exception_of_wrong_type",
                |_: &mut Self, _: &mut Context| {
                    Steps::new()
                        .then(|_: &mut Self, _: &mut Context| Ok(Step::NextTick))
                        .then(|_: &mut Self, _: &mut Context| exception::throw(&ERROR, "wrong kind"))
                },
            )
            .should_throw(&NULL_REFERENCE),
            TestMethod::new("test_pass_via_uncaught_exception", |_: &mut Self, _: &mut Context| -> Outcome {
                exception::throw(&ERROR, "raised from a plain body")
            })
            .should_throw_any(),
            TestMethod::new(
                "test_fail_method_via_uncaught_exception_of_wrong_type",
                |_: &mut Self, _: &mut Context| -> Outcome { exception::throw(&ERROR, "wrong kind") },
            )
            .should_throw(&NULL_REFERENCE),
        ]
    }
}

fn main() {
    let aggregator = Aggregator::new()
        .suite(States {
            pause_for: Duration::from_secs(5),
        })
        .suite(ExceptionHandling)
        .suite(ExceptionHandlingOverrides);
    std::process::exit(tickrun::cli::main_with(aggregator));
}
