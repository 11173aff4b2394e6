//! Picks the tests of a suite pass: which registered methods count as
//! tests, which of those survive the include/exclude filters, and the
//! randomized order they run in.
pub mod toml;

use crate::errors::TickError;
use rand::{rngs::StdRng, RngExt};
use regex::Regex;

/// Registered methods only run if their name says they are tests.
pub fn is_test_name(name: &str) -> bool {
    name.get(..4)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("test"))
}

/// Pre-filters matched against the string `<suite>:<method>`.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl Filter {
    /// Compile the include and exclude patterns.
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self, TickError> {
        let compile = |pattern: &str, flag: &str| {
            Regex::new(pattern)
                .map_err(|err| TickError(format!("Invalid --{} regex: {}", flag, err)))
        };
        Ok(Self {
            include: include.map(|p| compile(p, "include")).transpose()?,
            exclude: exclude.map(|p| compile(p, "exclude")).transpose()?,
        })
    }

    pub fn accepts(&self, suite: &str, method: &str) -> bool {
        let name = format!("{}:{}", suite, method);
        let included = self.include.as_ref().map_or(true, |inc| inc.is_match(&name));
        let excluded = self.exclude.as_ref().map_or(false, |ex| ex.is_match(&name));
        included && !excluded
    }
}

/// Build a sequence by inserting each item at a uniformly random position
/// among the items already placed. Every item appears exactly once.
pub fn shuffle_by_insertion<T>(items: impl IntoIterator<Item = T>, rng: &mut StdRng) -> Vec<T> {
    let mut placed = Vec::new();
    for item in items {
        let at = rng.random_range(0..=placed.len());
        placed.insert(at, item);
    }
    placed
}

/// Indices of the methods in `names` to run for this pass, in run order.
pub fn discover<'a>(
    suite: &str,
    names: impl IntoIterator<Item = &'a str>,
    filter: &Filter,
    rng: &mut StdRng,
) -> Vec<usize> {
    let candidates = names.into_iter().enumerate().filter(|(_, name)| {
        if !is_test_name(name) {
            tracing::warn!(suite, method = name, "registered method is not named like a test, skipping");
            return false;
        }
        filter.accepts(suite, name)
    });
    shuffle_by_insertion(candidates.map(|(idx, _)| idx), rng)
}
