//! Drives an [`Aggregator`] from a tokio timer and forwards its events to a
//! [`Reporter`].
use crate::{
    clock::Pacing,
    errors::TickError,
    executor::{Aggregator, Event, Progress},
    printer::Reporter,
};
use futures::{channel::mpsc, StreamExt};
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Default ticks per second under realtime pacing.
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Resumes a driver stopped at a break-on-failure checkpoint.
#[derive(Clone)]
pub struct PauseHandle(mpsc::UnboundedSender<()>);

impl PauseHandle {
    /// Returns false if the driver is gone.
    pub fn resume(&self) -> bool {
        self.0.unbounded_send(()).is_ok()
    }
}

pub struct Driver<R: Reporter> {
    aggregator: Aggregator,
    reporter: R,
    tick_rate: u32,
    resume: Option<mpsc::UnboundedReceiver<()>>,
}

impl<R: Reporter> Driver<R> {
    pub fn new(aggregator: Aggregator, reporter: R) -> Self {
        Self {
            aggregator,
            reporter,
            tick_rate: DEFAULT_TICK_RATE,
            resume: None,
        }
    }

    /// Ticks per second while a realtime variant runs. Fixed pacings tick
    /// as fast as they can.
    pub fn with_tick_rate(mut self, tick_rate: u32) -> Self {
        self.tick_rate = tick_rate.max(1);
        self
    }

    /// A handle for resuming after a pause. Without one, pauses are logged
    /// and the run carries on.
    pub fn pause_handle(&mut self) -> PauseHandle {
        let (tx, rx) = mpsc::unbounded();
        self.resume = Some(rx);
        PauseHandle(tx)
    }

    /// Tick until every suite under every pacing is done.
    pub async fn run(mut self) -> Result<(Aggregator, R), TickError> {
        let mut interval = time::interval(Duration::from_secs(1) / self.tick_rate);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Instant::now();

        loop {
            match self.aggregator.current_pacing() {
                Pacing::Realtime => {
                    interval.tick().await;
                }
                Pacing::Fixed { .. } => tokio::task::yield_now().await,
            }
            let now = Instant::now();
            let progress = self.aggregator.tick(now - last)?;
            last = now;
            self.dispatch();

            match progress {
                Progress::Running => {}
                Progress::Paused { .. } => {
                    self.wait_for_resume().await;
                    // Time spent paused is not part of the run.
                    last = Instant::now();
                }
                Progress::Finished => break,
            }
        }

        let totals = self.aggregator.totals();
        tracing::info!(
            tests = totals.tests,
            failed = totals.tests_failed,
            "run finished"
        );
        self.reporter.finished(&totals);
        Ok((self.aggregator, self.reporter))
    }

    async fn wait_for_resume(&mut self) {
        match self.resume.as_mut() {
            Some(resume) => {
                tracing::info!("paused, waiting for resume");
                if resume.next().await.is_none() {
                    tracing::warn!("pause handle dropped, no longer pausing");
                    self.resume = None;
                }
            }
            None => tracing::warn!("paused without a pause handle, continuing"),
        }
    }

    fn dispatch(&mut self) {
        let events = self.aggregator.drain_events();
        let results = self.aggregator.results();
        for event in events {
            match event {
                Event::SuiteStarted { suite } => {
                    if let Some(suite) = results.get(suite) {
                        self.reporter.suite_started(suite);
                    }
                }
                Event::TestFinished { suite, test } => {
                    if let Some(suite) = results.get(suite) {
                        if let Some(test) = suite.results().get(test) {
                            self.reporter.test_finished(suite, test);
                        }
                    }
                }
                Event::Paused {
                    suite,
                    test,
                    checkpoint,
                } => {
                    if let Some(suite) = results.get(suite) {
                        if let Some(test) = suite.results().get(test) {
                            self.reporter.paused(suite, test, checkpoint);
                        }
                    }
                }
                Event::StageStarted { .. } | Event::SuiteFinished { .. } => {}
            }
        }
    }
}
