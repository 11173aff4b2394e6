use super::{
    context::Context,
    reconcile,
    results::{AssertionOutcome, SuiteResult},
    test::{Adapter, Advance, Shape, Step, TestMethod},
};
use crate::{
    clock::Clock,
    errors::TickError,
    exception::{self, Outcome, Raise},
    picker::{self, Filter},
    trace::TraceConfig,
};
use rand::rngs::StdRng;
use std::time::Duration;

/// A collection of test methods sharing Setup and TearDown.
///
/// Tests are registered explicitly through [`Suite::tests`]; only entries
/// whose name starts with `test` (any case) are run.
pub trait Suite: 'static {
    /// Suite identifier used in results. Defaults to the type name.
    fn name(&self) -> String {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full).to_string()
    }

    fn tests() -> Vec<TestMethod<Self>>
    where
        Self: Sized;

    fn setup(&mut self, _ctx: &mut Context<'_>) -> Outcome {
        Ok(())
    }

    fn tear_down(&mut self, _ctx: &mut Context<'_>) -> Outcome {
        Ok(())
    }
}

/// Lifecycle of one test. Transitions are strictly sequential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    SetupRunning,
    BodyRunning,
    Reconciling,
    TearDownRunning,
    Done,
}

/// Where the scheduler stopped for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// After the body and reconciliation, before TearDown.
    BeforeTearDown,
    /// TearDown itself added a failure.
    AfterTearDown,
}

/// What a tick achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Work remains; call `tick` again on the next tick.
    Running,
    /// Break-on-failure stopped at a checkpoint. `test` is the index of the
    /// result in its suite. The next tick carries on.
    Paused { checkpoint: Checkpoint, test: usize },
    /// Every test of the pass is done.
    Finished,
}

/// Resumption condition for a suspended body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Frame(u64),
    Time(Duration),
}

impl Wait {
    fn after(step: Step, clock: &Clock) -> Option<Wait> {
        match step {
            Step::NextTick => Some(Wait::Frame(clock.frame() + 1)),
            Step::Ticks(n) => Some(Wait::Frame(clock.frame() + u64::from(n.max(1)))),
            // Past the end of representable time means never.
            Step::Wait(duration) => Some(Wait::Time(
                clock.time().checked_add(duration).unwrap_or(Duration::MAX),
            )),
            Step::Done => None,
        }
    }

    fn is_over(&self, clock: &Clock) -> bool {
        match self {
            Wait::Frame(frame) => clock.frame() >= *frame,
            Wait::Time(time) => clock.time() >= *time,
        }
    }
}

/// Bookkeeping for the test in flight.
struct Running {
    method: usize,
    slot: usize,
    phase: Phase,
    halted: bool,
    setup_ok: bool,
    wait: Option<Wait>,
    pause_after: bool,
}

/// Drives the tests of one suite instance, one tick at a time.
pub struct Supervisor<S: Suite> {
    suite: S,
    methods: Vec<TestMethod<S>>,
    order: Vec<usize>,
    cursor: usize,
    current: Option<Running>,
    adapter: Adapter<S>,
    break_on_failure: bool,
    trace: TraceConfig,
}

impl<S: Suite> Supervisor<S> {
    pub fn new(suite: S) -> Self {
        Self {
            suite,
            methods: S::tests(),
            order: Vec::new(),
            cursor: 0,
            current: None,
            adapter: Adapter::default(),
            break_on_failure: false,
            trace: TraceConfig::default(),
        }
    }

    /// Pause at checkpoints when a test fails.
    pub fn break_on_failure(mut self, enabled: bool) -> Self {
        self.break_on_failure = enabled;
        self
    }

    pub fn suite(&self) -> &S {
        &self.suite
    }

    pub fn suite_mut(&mut self) -> &mut S {
        &mut self.suite
    }

    /// Phase of the test in flight, if any.
    pub fn phase(&self) -> Option<Phase> {
        self.current.as_ref().map(|run| run.phase)
    }

    /// Run `hook` (Setup or TearDown) and record what it raised.
    fn run_hook(
        suite: &mut S,
        ctx: &mut Context<'_>,
        hook: fn(&mut S, &mut Context<'_>) -> Outcome,
        label: &str,
    ) -> bool {
        match exception::catch(|| hook(suite, ctx)) {
            Ok(()) => true,
            // The failed assertion already recorded itself.
            Err(Raise::FailFast) => false,
            Err(Raise::Exception(exception)) => {
                tracing::debug!(%exception, "uncaught exception in {}", label);
                ctx.record(AssertionOutcome::failure(
                    format!("Uncaught exception in {}()", label),
                    None,
                    Some(exception),
                ));
                false
            }
        }
    }

    /// Advance the suite by one tick: run the test in flight up to its next
    /// suspension point, or move to the next test.
    pub fn tick(&mut self, results: &mut SuiteResult, clock: &Clock) -> Result<Progress, TickError> {
        let Supervisor {
            suite,
            methods,
            order,
            cursor,
            current,
            adapter,
            break_on_failure,
            trace,
        } = self;

        loop {
            let run = match current.as_mut() {
                Some(run) => run,
                None => {
                    let Some(&method) = order.get(*cursor) else {
                        return Ok(Progress::Finished);
                    };
                    *cursor += 1;
                    let name = methods[method].name();
                    tracing::debug!(suite = results.suite_id(), method = name, "starting test");
                    let slot = results.begin(name);
                    adapter.reset();
                    *current = Some(Running {
                        method,
                        slot,
                        phase: Phase::Created,
                        halted: false,
                        setup_ok: false,
                        wait: None,
                        pause_after: false,
                    });
                    continue;
                }
            };

            let method = &methods[run.method];
            let result = results.get_mut(run.slot).ok_or_else(|| {
                TickError(format!("missing result slot {} for {}", run.slot, method.name()))
            })?;

            match run.phase {
                Phase::Created => run.phase = Phase::SetupRunning,
                Phase::SetupRunning => {
                    run.halted = false;
                    let mut ctx = Context::new(result, &mut run.halted, clock, trace);
                    run.setup_ok = Self::run_hook(suite, &mut ctx, S::setup, "Setup");
                    run.phase = if run.setup_ok {
                        run.halted = false;
                        Phase::BodyRunning
                    } else {
                        Phase::Reconciling
                    };
                }
                Phase::BodyRunning => {
                    if let Some(wait) = run.wait {
                        if !wait.is_over(clock) {
                            return Ok(Progress::Running);
                        }
                        run.wait = None;
                    }
                    if let Shape::Unsupported { returns } = method.shape() {
                        result.record_failure(AssertionOutcome::failure(
                            format!(
                                "Test method {} must return (), Outcome, or a step sequence.  Returns: {}",
                                method.name(),
                                returns
                            ),
                            None,
                            None,
                        ));
                    }
                    let mut ctx = Context::new(result, &mut run.halted, clock, trace);
                    match adapter.advance(method, suite, &mut ctx) {
                        Advance::Suspended(step) => {
                            run.wait = Wait::after(step, clock);
                            tracing::trace!(method = method.name(), ?step, "test suspended");
                            return Ok(Progress::Running);
                        }
                        Advance::Finished => {
                            debug_assert!(!adapter.has_more_steps());
                            run.phase = Phase::Reconciling;
                        }
                    }
                }
                Phase::Reconciling => {
                    // A failed Setup means the body never ran: nothing to reconcile.
                    if run.setup_ok {
                        if let Some(failure) =
                            reconcile::reconcile(method.expected(), adapter.captured())
                        {
                            result.record_failure(failure);
                        }
                    }
                    run.phase = Phase::TearDownRunning;
                    if *break_on_failure && !result.passed() {
                        tracing::warn!(method = method.name(), "test failed, pausing before TearDown");
                        return Ok(Progress::Paused {
                            checkpoint: Checkpoint::BeforeTearDown,
                            test: run.slot,
                        });
                    }
                }
                Phase::TearDownRunning => {
                    let failures_before = result.failure_count();
                    run.halted = false;
                    let mut ctx = Context::new(result, &mut run.halted, clock, trace);
                    Self::run_hook(suite, &mut ctx, S::tear_down, "TearDown");
                    run.pause_after =
                        *break_on_failure && result.failure_count() > failures_before;
                    run.phase = Phase::Done;
                }
                Phase::Done => {
                    result.done();
                    tracing::debug!(
                        method = method.name(),
                        assertions = result.assertion_count(),
                        failures = result.failure_count(),
                        "finished test"
                    );
                    let (slot, pause_after) = (run.slot, run.pause_after);
                    results.accumulate(slot);
                    *current = None;
                    // Yield between tests so two tests never share a tick.
                    return Ok(if pause_after {
                        Progress::Paused {
                            checkpoint: Checkpoint::AfterTearDown,
                            test: slot,
                        }
                    } else {
                        Progress::Running
                    });
                }
            }
        }
    }
}

/// Type-erased view of a [`Supervisor`], so one aggregator can drive suites
/// of different types.
pub trait Supervise {
    fn suite_id(&self) -> String;

    /// Registered method names, in registration order.
    fn method_names(&self) -> Vec<String>;

    /// Apply run-wide settings. `break_on_failure` overrides the suite's own
    /// setting when present.
    fn configure(&mut self, trace: &TraceConfig, break_on_failure: Option<bool>);

    /// Pick and order the tests for a new pass.
    fn start_pass(&mut self, filter: &Filter, rng: &mut StdRng);

    fn tick(&mut self, results: &mut SuiteResult, clock: &Clock) -> Result<Progress, TickError>;
}

impl<S: Suite> Supervise for Supervisor<S> {
    fn suite_id(&self) -> String {
        self.suite.name()
    }

    fn method_names(&self) -> Vec<String> {
        self.methods.iter().map(|m| m.name().to_string()).collect()
    }

    fn configure(&mut self, trace: &TraceConfig, break_on_failure: Option<bool>) {
        self.trace = trace.clone();
        if let Some(enabled) = break_on_failure {
            self.break_on_failure = enabled;
        }
    }

    fn start_pass(&mut self, filter: &Filter, rng: &mut StdRng) {
        let suite = self.suite.name();
        self.order = picker::discover(
            &suite,
            self.methods.iter().map(|m| m.name()),
            filter,
            rng,
        );
        self.cursor = 0;
        self.current = None;
        self.adapter.reset();
    }

    fn tick(&mut self, results: &mut SuiteResult, clock: &Clock) -> Result<Progress, TickError> {
        Supervisor::tick(self, results, clock)
    }
}
