use crate::{
    clock::Pacing,
    driver::Driver,
    errors::{self, TickError},
    executor::Aggregator,
    picker::{toml::Config, Filter},
    printer::ConsoleReporter,
};
use std::{path::PathBuf, sync::Once};
use structopt::StructOpt;
use tokio::runtime;

/// Options for the CLI.
#[derive(StructOpt, Debug, Default)]
#[structopt(name = "tickrun", about = "Tick-driven test runner.")]
pub struct Opts {
    /// Directory holding an optional tickrun.toml.
    #[structopt(short = "C", long = "dir", default_value = ".", parse(from_os_str))]
    pub dir: PathBuf,

    /// Show diffs for failing string comparisons.
    #[structopt(short, long)]
    pub diff: bool,

    /// Also print passing tests.
    #[structopt(short, long)]
    pub verbose: bool,

    /// Only display tests from a specific class.
    #[structopt(short = "o", long = "only")]
    pub post_filter: Option<OnlyOpt>,

    /// Include tests that match the regex. Matched against <suite>:<method>.
    #[structopt(short = "i", long = "include")]
    pub include_filter: Option<String>,

    /// Exclude tests that match the regex. Matched against <suite>:<method>.
    #[structopt(short = "x", long = "exclude")]
    pub exclude_filter: Option<String>,

    /// Seed for the test order.
    #[structopt(long)]
    pub seed: Option<u64>,

    /// Pause before TearDown when a test fails.
    #[structopt(short, long)]
    pub break_on_failure: bool,

    /// Pacing variants in frames per second; 0 is realtime. May be repeated.
    #[structopt(short, long)]
    pub pacing: Vec<u32>,

    /// Print the suites and tests that would run without running them.
    #[structopt(short = "n", long)]
    pub dry_run: bool,
}

/// Possible values for the --only flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnlyOpt {
    /// Failing tests.
    Fail,
    /// Passing tests.
    Pass,
}

impl std::str::FromStr for OnlyOpt {
    type Err = errors::TickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(OnlyOpt::Fail),
            "pass" => Ok(OnlyOpt::Pass),
            _ => Err(errors::TickError(
                "Must be one of fail, pass.".to_string(),
            )),
        }
    }
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing output.
///
/// Safe to call multiple times. Enable with `RUST_LOG=tickrun=debug`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    });
}

/// Apply tickrun.toml and then the command line to `aggregator`. Command
/// line flags win over the file.
fn configure(aggregator: Aggregator, opts: &Opts, conf: Option<&Config>) -> Result<(Aggregator, u32), TickError> {
    let mut aggregator = aggregator;
    let mut tick_rate = crate::driver::DEFAULT_TICK_RATE;

    if let Some(conf) = conf {
        aggregator = aggregator
            .trace(conf.trace_config())
            .chain_stages(conf.chain_stages);
        if let Some(seed) = conf.seed {
            aggregator = aggregator.seed(seed);
        }
        if conf.break_on_failure {
            aggregator = aggregator.break_on_failure(true);
        }
        if let Some(pacings) = conf.pacings() {
            aggregator = aggregator.pacing(pacings);
        }
        if let Some(rate) = conf.tick_rate {
            tick_rate = rate;
        }
    }

    if let Some(seed) = opts.seed {
        aggregator = aggregator.seed(seed);
    }
    if opts.break_on_failure {
        aggregator = aggregator.break_on_failure(true);
    }
    if !opts.pacing.is_empty() {
        aggregator = aggregator.pacing(opts.pacing.iter().copied().map(Pacing::from_fps).collect());
    }
    let filter = Filter::new(
        opts.include_filter.as_deref(),
        opts.exclude_filter.as_deref(),
    )?;
    Ok((aggregator.filter(filter), tick_rate))
}

fn dry_run(aggregator: &Aggregator) {
    use colored::*;
    for (title, methods) in aggregator.plan() {
        println!("{}", title.blue());
        for method in methods {
            println!("  {}", method);
        }
    }
}

/// Run `aggregator` with `opts` and return the number of failed tests.
pub fn run(aggregator: Aggregator, opts: &Opts) -> Result<i32, TickError> {
    let conf = Config::from_path(&opts.dir)?;
    let (aggregator, tick_rate) = configure(aggregator, opts, conf.as_ref())?;

    if opts.dry_run {
        dry_run(&aggregator);
        return Ok(0);
    }

    tracing::info!(seed = aggregator.order_seed(), "running");
    let runtime = runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let driver = Driver::new(aggregator, ConsoleReporter::new(opts)).with_tick_rate(tick_rate);
    let (aggregator, _) = runtime.block_on(driver.run())?;
    Ok(aggregator.totals().tests_failed as i32)
}

/// Entry point for a test binary: parse the command line, run every suite,
/// and return the process exit code.
pub fn main_with(aggregator: Aggregator) -> i32 {
    init_tracing();
    let opts = Opts::from_args();
    match run(aggregator, &opts) {
        Err(TickError(msg)) => {
            println!("error: {}", msg);
            1
        }
        Ok(failed_tests) => failed_tests,
    }
}
