//! Console output: line diffs for mismatched text and the reporter used by
//! the command line.
use crate::{
    cli::Opts,
    executor::{Checkpoint, SuiteResult, TestResult, Totals},
};
use colored::Colorize;
use difference::{Changeset, Difference};
use std::{
    fmt,
    io::{self, Write},
};

/// Track the mode of difference printing.
#[derive(Clone, Copy, PartialEq, Debug)]
enum Mode {
    Same,
    Add,
    Rem,
}

/// Line number column; blank on the side a line does not exist on.
#[derive(PartialEq, Debug)]
struct Lineno(Option<usize>);

impl fmt::Display for Lineno {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            None => f.pad(""),
            Some(lineno) => fmt::Display::fmt(&lineno.to_string().dimmed(), f),
        }
    }
}

#[derive(PartialEq, Debug)]
struct Line<'a>(Mode, Lineno, Lineno, &'a str);

/// Number the lines of a changeset on both sides.
fn numbered(changes: &Changeset) -> Vec<Line<'_>> {
    let (mut line_a, mut line_b) = (0, 0);
    let mut lines = Vec::new();
    for diff in &changes.diffs {
        let (mode, text) = match diff {
            Difference::Same(x) => (Mode::Same, x),
            Difference::Add(x) => (Mode::Add, x),
            Difference::Rem(x) => (Mode::Rem, x),
        };
        for line in text.split('\n') {
            let (a, b) = match mode {
                Mode::Same => {
                    line_a += 1;
                    line_b += 1;
                    (Some(line_a), Some(line_b))
                }
                Mode::Add => {
                    line_b += 1;
                    (None, Some(line_b))
                }
                Mode::Rem => {
                    line_a += 1;
                    (Some(line_a), None)
                }
            };
            lines.push(Line(mode, Lineno(a), Lineno(b), line.trim_end()));
        }
    }
    lines
}

/// Render the difference between the expected text `org` and the actual
/// text `new`, with line numbers for both.
pub fn gen_diff(org: &str, new: &str) -> String {
    let changes = Changeset::new(org, new, "\n");
    let mut buf = String::new();
    for Line(mode, line_a, line_b, line) in numbered(&changes) {
        let (sign, text) = match mode {
            Mode::Add => ("+".green(), line.green()),
            Mode::Rem => ("-".red(), line.red()),
            Mode::Same => (" ".normal(), line.dimmed()),
        };
        buf.push_str(&format!("{:>3} {:>3}│{}{}\n", line_a, line_b, sign, text));
    }
    buf.trim_end().to_string()
}

/// Receives progress from a [`crate::driver::Driver`].
pub trait Reporter {
    fn suite_started(&mut self, _suite: &SuiteResult) {}

    fn test_finished(&mut self, _suite: &SuiteResult, _test: &TestResult) {}

    fn paused(&mut self, _suite: &SuiteResult, _test: &TestResult, _checkpoint: Checkpoint) {}

    fn finished(&mut self, _totals: &Totals) {}
}

/// Ignores everything.
impl Reporter for () {}

/// Streams results to stdout as tests finish, filtered by the command line
/// options.
pub struct ConsoleReporter<'a> {
    opts: &'a Opts,
    out: io::BufWriter<io::Stdout>,
}

impl<'a> ConsoleReporter<'a> {
    pub fn new(opts: &'a Opts) -> Self {
        Self {
            opts,
            out: io::BufWriter::new(io::stdout()),
        }
    }

    fn emit(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            tracing::warn!(%err, "failed to write report");
        }
    }
}

/// Summary line, e.g. `3 passing / 1 failing`.
pub fn summary(totals: &Totals) -> String {
    let passing = totals.tests - totals.tests_failed;
    format!(
        "  {} / {} / {}",
        format!("{} passing", passing).green().bold(),
        format!("{} failing", totals.tests_failed).red().bold(),
        format!(
            "{}/{} assertions failed",
            totals.assertions_failed, totals.assertions
        )
        .dimmed()
    )
}

impl Reporter for ConsoleReporter<'_> {
    fn suite_started(&mut self, suite: &SuiteResult) {
        let title = suite.title().bold().to_string();
        self.emit(&title);
    }

    fn test_finished(&mut self, _suite: &SuiteResult, test: &TestResult) {
        if test.should_print(self.opts) {
            let line = format!("  {}", test.report_str(self.opts.diff));
            self.emit(&line);
        }
    }

    fn paused(&mut self, suite: &SuiteResult, test: &TestResult, checkpoint: Checkpoint) {
        let at = match checkpoint {
            Checkpoint::BeforeTearDown => "before TearDown",
            Checkpoint::AfterTearDown => "after TearDown",
        };
        let line = format!(
            "{} {}:{} {}",
            "paused".yellow().bold(),
            suite.title(),
            test.method_id(),
            at
        );
        self.emit(&line);
    }

    fn finished(&mut self, totals: &Totals) {
        let line = summary(totals);
        self.emit(&line);
    }
}
