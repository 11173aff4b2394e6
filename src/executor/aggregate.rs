use super::{
    results::{SuiteResult, Totals},
    suite::{Checkpoint, Progress, Suite, Supervise, Supervisor},
};
use crate::{
    clock::{Clock, Pacing},
    errors::TickError,
    picker::Filter,
    trace::TraceConfig,
};
use rand::{rngs::StdRng, RngExt, SeedableRng};
use std::{collections::VecDeque, time::Duration};

/// Something that happened during a tick, in order. Indices point into
/// [`Aggregator::results`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StageStarted { name: String },
    SuiteStarted { suite: usize },
    TestFinished { suite: usize, test: usize },
    Paused { suite: usize, test: usize, checkpoint: Checkpoint },
    SuiteFinished { suite: usize },
}

/// Most events [`Aggregator`] keeps between two drains.
pub const MAX_QUEUED_EVENTS: usize = 1024;

#[derive(Default)]
struct EventQueue {
    queued: VecDeque<Event>,
    dropped: usize,
}

impl EventQueue {
    fn push(&mut self, event: Event) {
        if self.queued.len() >= MAX_QUEUED_EVENTS {
            if self.dropped == 0 {
                tracing::warn!(
                    limit = MAX_QUEUED_EVENTS,
                    "event queue full, dropping the oldest events"
                );
            }
            self.queued.pop_front();
            self.dropped += 1;
        }
        self.queued.push_back(event);
    }
}

/// A group of suites that run together, like the suites of one scene.
struct Stage {
    name: String,
    suites: Vec<Box<dyn Supervise>>,
}

/// The (pacing, suite) combination being driven.
struct Cursor {
    pacing: usize,
    suite: usize,
    result: usize,
    /// Tests of this combination already reported as finished.
    reported: usize,
}

/// Runs every suite once per pacing variant and collects one
/// [`SuiteResult`] per combination.
pub struct Aggregator {
    stages: VecDeque<Stage>,
    active: Option<Stage>,
    stages_done: usize,
    pacings: Vec<Pacing>,
    chain_stages: bool,
    break_on_failure: Option<bool>,
    trace: TraceConfig,
    filter: Filter,
    seed: u64,
    rng: StdRng,
    results: Vec<SuiteResult>,
    next: (usize, usize),
    cursor: Option<Cursor>,
    clock: Clock,
    events: EventQueue,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    /// An empty aggregator with a random order seed and realtime pacing.
    pub fn new() -> Self {
        let seed: u64 = rand::rng().random();
        Self {
            stages: VecDeque::new(),
            active: None,
            stages_done: 0,
            pacings: vec![Pacing::Realtime],
            chain_stages: false,
            break_on_failure: None,
            trace: TraceConfig::default(),
            filter: Filter::default(),
            seed,
            rng: StdRng::seed_from_u64(seed),
            results: Vec::new(),
            next: (0, 0),
            cursor: None,
            clock: Clock::default(),
            events: EventQueue::default(),
        }
    }

    /// Start a new stage; suites added afterwards belong to it.
    pub fn stage(mut self, name: impl Into<String>) -> Self {
        self.stages.push_back(Stage {
            name: name.into(),
            suites: Vec::new(),
        });
        self
    }

    /// Add a suite with default settings to the last stage.
    pub fn suite<S: Suite>(self, suite: S) -> Self {
        self.supervisor(Supervisor::new(suite))
    }

    /// Add a configured supervisor to the last stage.
    pub fn supervisor<S: Suite>(mut self, supervisor: Supervisor<S>) -> Self {
        if self.stages.is_empty() {
            self = self.stage("default");
        }
        if let Some(stage) = self.stages.back_mut() {
            stage.suites.push(Box::new(supervisor));
        }
        self
    }

    /// Run every suite once per pacing. An empty list means realtime only,
    /// and `Fixed { fps: 0 }` is taken as realtime.
    pub fn pacing(mut self, pacings: Vec<Pacing>) -> Self {
        self.pacings = if pacings.is_empty() {
            vec![Pacing::Realtime]
        } else {
            pacings
                .into_iter()
                .map(|pacing| match pacing {
                    Pacing::Fixed { fps } => Pacing::from_fps(fps),
                    realtime => realtime,
                })
                .collect()
        };
        self
    }

    /// Fix the seed of the test order.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Override every suite's break-on-failure setting.
    pub fn break_on_failure(mut self, enabled: bool) -> Self {
        self.break_on_failure = Some(enabled);
        self
    }

    /// Continue with the next stage once the current one is done.
    pub fn chain_stages(mut self, enabled: bool) -> Self {
        self.chain_stages = enabled;
        self
    }

    pub fn trace(mut self, trace: TraceConfig) -> Self {
        self.trace = trace;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn order_seed(&self) -> u64 {
        self.seed
    }

    pub fn pacings(&self) -> &[Pacing] {
        &self.pacings
    }

    /// Pacing of the combination being driven.
    pub fn current_pacing(&self) -> Pacing {
        self.cursor
            .as_ref()
            .map(|cursor| self.pacings[cursor.pacing])
            .unwrap_or_default()
    }

    /// All results so far, one per (suite, pacing) combination started.
    pub fn results(&self) -> &[SuiteResult] {
        &self.results
    }

    pub fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        self.results.iter().for_each(|suite| totals.merge(&suite.totals()));
        totals
    }

    /// Take the events queued by previous ticks.
    ///
    /// Events queue up until drained. At most [`MAX_QUEUED_EVENTS`] are
    /// kept; past that the oldest are dropped.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.queued.drain(..).collect()
    }

    /// Events dropped so far because nobody drained the queue.
    pub fn dropped_events(&self) -> usize {
        self.events.dropped
    }

    /// The combinations that would run, as (title, registered methods),
    /// without running anything.
    pub fn plan(&self) -> Vec<(String, Vec<String>)> {
        let stages = self.active.iter().chain(self.stages.iter());
        let stages = stages.take(if self.chain_stages { usize::MAX } else { 1 });
        let mut plan = Vec::new();
        for stage in stages {
            for pacing in &self.pacings {
                for suite in &stage.suites {
                    let title = SuiteResult::new(suite.suite_id(), pacing.label()).title();
                    plan.push((title, suite.method_names()));
                }
            }
        }
        plan
    }

    /// Start the next (pacing, suite) combination, moving to the next stage
    /// when allowed. Returns false when there is nothing left to run.
    fn begin_next(&mut self) -> bool {
        loop {
            if self.active.is_none() {
                if self.stages_done > 0 && !self.chain_stages {
                    return false;
                }
                let Some(mut stage) = self.stages.pop_front() else {
                    return false;
                };
                tracing::info!(stage = %stage.name, seed = self.seed, "starting stage");
                for suite in stage.suites.iter_mut() {
                    suite.configure(&self.trace, self.break_on_failure);
                }
                self.events.push(Event::StageStarted {
                    name: stage.name.clone(),
                });
                self.active = Some(stage);
                self.next = (0, 0);
            }

            let Some(stage) = self.active.as_mut() else {
                continue;
            };
            let (pacing, suite) = self.next;
            if pacing >= self.pacings.len() || suite >= stage.suites.len() {
                self.active = None;
                self.stages_done += 1;
                continue;
            }
            self.next = if suite + 1 < stage.suites.len() {
                (pacing, suite + 1)
            } else {
                (pacing + 1, 0)
            };

            let supervisor = &mut stage.suites[suite];
            supervisor.start_pass(&self.filter, &mut self.rng);
            let result = SuiteResult::new(supervisor.suite_id(), self.pacings[pacing].label());
            tracing::info!(suite = %result.title(), "starting suite");
            self.results.push(result);
            self.clock = Clock::new(self.pacings[pacing]);
            self.cursor = Some(Cursor {
                pacing,
                suite,
                result: self.results.len() - 1,
                reported: 0,
            });
            self.events.push(Event::SuiteStarted {
                suite: self.results.len() - 1,
            });
            return true;
        }
    }

    /// Advance by one tick. `real_elapsed` is the real time since the
    /// previous tick; fixed pacings ignore it. Events produced on the way
    /// are queued for [`Aggregator::drain_events`].
    pub fn tick(&mut self, real_elapsed: Duration) -> Result<Progress, TickError> {
        self.clock.advance(real_elapsed);
        loop {
            if self.cursor.is_none() && !self.begin_next() {
                return Ok(Progress::Finished);
            }
            let Some(cursor) = self.cursor.as_mut() else {
                return Ok(Progress::Finished);
            };
            let supervisor = self
                .active
                .as_mut()
                .and_then(|stage| stage.suites.get_mut(cursor.suite))
                .ok_or_else(|| TickError(format!("no suite at index {}", cursor.suite)))?;
            let results = self
                .results
                .get_mut(cursor.result)
                .ok_or_else(|| TickError(format!("no suite result at index {}", cursor.result)))?;

            let progress = supervisor.tick(results, &self.clock)?;

            while let Some(test) = results.results().get(cursor.reported) {
                if test.is_running() {
                    break;
                }
                self.events.push(Event::TestFinished {
                    suite: cursor.result,
                    test: cursor.reported,
                });
                cursor.reported += 1;
            }

            match progress {
                Progress::Running => return Ok(progress),
                Progress::Paused { checkpoint, test } => {
                    self.events.push(Event::Paused {
                        suite: cursor.result,
                        test,
                        checkpoint,
                    });
                    return Ok(progress);
                }
                Progress::Finished => {
                    let totals = results.totals();
                    tracing::info!(
                        suite = %results.title(),
                        tests = totals.tests,
                        failed = totals.tests_failed,
                        "finished suite"
                    );
                    self.events.push(Event::SuiteFinished {
                        suite: cursor.result,
                    });
                    self.cursor = None;
                }
            }
        }
    }
}
