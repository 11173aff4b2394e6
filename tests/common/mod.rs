use std::time::Duration;
use tickrun::{
    executor::{Event, Progress},
    Aggregator, SuiteResult, TestResult,
};

/// Tick `aggregator` until it finishes, passing `real` as the elapsed time
/// of every tick. Returns every event seen.
pub fn run_to_end(aggregator: &mut Aggregator, real: Duration) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..100_000 {
        let progress = aggregator.tick(real).unwrap();
        events.extend(aggregator.drain_events());
        if progress == Progress::Finished {
            return events;
        }
    }
    panic!("aggregator did not finish");
}

pub fn find<'a>(suite: &'a SuiteResult, method: &str) -> &'a TestResult {
    suite
        .results()
        .iter()
        .find(|r| r.method_id() == method)
        .unwrap_or_else(|| panic!("{} did not run", method))
}
