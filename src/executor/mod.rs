//! An executor is responsible for running suites tick by tick and
//! generating results.

pub mod aggregate;
pub mod context;
pub mod reconcile;
pub mod results;
pub mod suite;

pub use aggregate::{Aggregator, Event, MAX_QUEUED_EVENTS};
pub use context::Context;
pub use reconcile::ExpectedExceptions;
pub use results::{AssertionOutcome, State, SuiteResult, TestResult, Totals};
pub use suite::{Checkpoint, Phase, Progress, Suite, Supervise, Supervisor};
pub use test::{repeat, Coroutine, Repeat, Step, Steps, TestMethod};
