//! Tickrun is a tick-driven test runner for tests that need to wait for a
//! simulation to move forward.
//!
//! A tickrun test body may run to completion in one call, or it may be a
//! sequence of steps that suspends between ticks: "spawn the object, wait
//! two ticks, check it moved". Tests are driven by an external tick, so one
//! slow test never blocks the rest of the program, and the same suites can
//! be run once per pacing variant (realtime, or a fixed frame rate).
//!
//! ## Testing Model
//! Tests are organized in suites. A suite is a type implementing
//! [`Suite`]: it registers its test methods and may override `setup` and
//! `tear_down`, which run around every test.
//! ```no_run
//! use tickrun::{Aggregator, Context, Outcome, Step, Steps, Suite, TestMethod};
//!
//! #[derive(Default)]
//! struct Falling {
//!     height: f32,
//! }
//!
//! impl Suite for Falling {
//!     fn tests() -> Vec<TestMethod<Self>> {
//!         vec![
//!             TestMethod::new("test_starts_high", |s: &mut Self, ctx: &mut Context| -> Outcome {
//!                 ctx.assert_true(s.height >= 0.0)
//!             }),
//!             TestMethod::new("test_falls", |s: &mut Self, _: &mut Context| {
//!                 s.height = 10.0;
//!                 Steps::new().then(|s: &mut Self, ctx: &mut Context| {
//!                     ctx.assert_true_msg(s.height < 10.0, "did not fall")?;
//!                     Ok(Step::Done)
//!                 })
//!             }),
//!         ]
//!     }
//! }
//!
//! fn main() {
//!     let code = tickrun::cli::main_with(Aggregator::new().suite(Falling::default()));
//!     std::process::exit(code);
//! }
//! ```
//!
//! What a test method returns decides how it runs:
//!   - `()` or [`Outcome`]: the body runs once.
//!   - [`Steps`], `Box<dyn Coroutine<S>>` (see [`repeat`]) or either one
//!     wrapped in `Result<_, Raise>`: the body runs one step per resumption.
//!     Each step returns a [`Step`] saying how long to wait.
//!   - Anything else is recorded as a failure.
//!
//! Assertions live on [`Context`] and return an [`Outcome`]. A failed
//! assertion is recorded with a trace and stops the test through `?`.
//! Errors raised with [`exception::throw`], returned through `?`, or
//! panics are caught and compared against the kinds declared with
//! [`TestMethod::should_throw`].
//!
//! ## Running
//! [`cli::main_with`] parses the command line, reads an optional
//! `tickrun.toml`, runs every suite and prints a summary:
//! ```text
//! Falling
//!   ✗ test_falls (1/1 assertions failed)
//!     did not fall
//!       at tests/falling.rs:line 31
//!   1 passing / 1 failing / 1/2 assertions failed
//! ```
//! The process exits with the number of failing tests.
//!
//! ## Filters
//!   - Pre-filters: The `--include` and `--exclude` flags select tests whose
//!     names match (or don't match) a regex. The regexes are matched against
//!     the string `<suite-name>:<method>`.
//!   - Post-filters: The `--only` flag prints only the tests with a specific
//!     result (`fail` or `pass`). All selected tests still run.
//!
//! ## Order and Pacing
//! Tests run in a random order. The seed is logged; pass `--seed` (or set
//! `seed` in `tickrun.toml`) to replay an order. `--pacing 0 --pacing 30`
//! runs every suite twice, once in realtime and once at a fixed 30 frames
//! per second; results of the second run are titled `Suite [@30 fps]`.
//!
//! ## Break on Failure
//! With `--break-on-failure` the runner pauses before TearDown of a failing
//! test, and after TearDown if TearDown itself failed, so the state can be
//! inspected. See [`driver::PauseHandle`].
pub mod cli;
pub mod clock;
pub mod driver;
pub mod errors;
pub mod exception;
pub mod executor;
pub mod picker;
pub mod printer;
pub mod trace;

pub use clock::{Clock, Pacing};
pub use exception::{Exception, ExceptionKind, Outcome, Raise};
pub use executor::{
    repeat, Aggregator, Context, Coroutine, Step, Steps, Suite, SuiteResult, Supervisor,
    TestMethod, TestResult,
};
