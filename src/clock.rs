//! Simulated time for a run.
use std::time::Duration;

/// How the clock advances between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Each tick advances by the real time that elapsed since the last one.
    #[default]
    Realtime,
    /// Each tick advances by exactly `1/fps` seconds, however long it
    /// really took.
    Fixed { fps: u32 },
}

impl Pacing {
    /// `0` means realtime, anything else a fixed step.
    pub fn from_fps(fps: u32) -> Self {
        if fps == 0 {
            Pacing::Realtime
        } else {
            Pacing::Fixed { fps }
        }
    }

    /// Variant label for results run under this pacing. Empty for realtime.
    pub fn label(&self) -> String {
        match self {
            Pacing::Realtime | Pacing::Fixed { fps: 0 } => String::new(),
            Pacing::Fixed { fps } => format!("[@{} fps]", fps),
        }
    }

    /// Fixed step length, if any. `Fixed { fps: 0 }` has none and runs
    /// like realtime.
    pub fn step(&self) -> Option<Duration> {
        match self {
            Pacing::Realtime | Pacing::Fixed { fps: 0 } => None,
            Pacing::Fixed { fps } => {
                Some(Duration::from_nanos(1_000_000_000 / u64::from(*fps)))
            }
        }
    }
}

/// Frame counter and simulated time.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    frame: u64,
    time: Duration,
    delta: Duration,
    pacing: Pacing,
}

impl Clock {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            pacing,
            ..Self::default()
        }
    }

    /// Number of ticks seen so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulated time since the clock started.
    pub fn time(&self) -> Duration {
        self.time
    }

    /// Length of the last tick.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Advance by one tick. Fixed pacing ignores `real_elapsed`.
    pub fn advance(&mut self, real_elapsed: Duration) {
        let delta = self.pacing.step().unwrap_or(real_elapsed);
        self.frame += 1;
        self.time += delta;
        self.delta = delta;
    }
}
