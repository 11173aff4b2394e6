//! Traces attached to recorded failures.
//!
//! A trace always starts at the call site of the failing assertion (known
//! through `#[track_caller]`). When the environment provides backtraces
//! (`RUST_BACKTRACE`, or `force_backtrace` in the configuration) the
//! remaining frames are appended, minus the frames that belong to the
//! engine and the Rust runtime. File paths are shown relative to the
//! configured project root.
use regex::Regex;
use std::{
    backtrace::{Backtrace, BacktraceStatus},
    panic::Location,
    path::PathBuf,
    sync::OnceLock,
};

/// How traces are captured.
#[derive(Debug, Clone, Default)]
pub struct TraceConfig {
    /// Prefix stripped from file paths. Defaults to the working directory.
    pub root: Option<PathBuf>,
    /// Capture a backtrace even when `RUST_BACKTRACE` is unset.
    pub force_backtrace: bool,
}

/// Symbol prefixes that never show up in a recorded trace.
const HIDDEN_PREFIXES: &[&str] = &[
    "tickrun::",
    "<tickrun::",
    "std::",
    "<std::",
    "core::",
    "<core::",
    "alloc::",
    "<alloc::",
    "test::",
    "__rust",
    "rust_begin_unwind",
    "__libc",
    "_start",
];

struct Frame {
    symbol: String,
    file: Option<(String, u32)>,
}

fn frame_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d+:\s+(.+)$").expect("static regex"))
}

fn location_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*at\s+(.+):(\d+):\d+$").expect("static regex")
    })
}

/// Parse the textual form of a `std::backtrace::Backtrace`.
fn parse_frames(rendered: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    for line in rendered.lines() {
        if let Some(caps) = frame_re().captures(line) {
            frames.push(Frame {
                symbol: caps[1].trim().to_string(),
                file: None,
            });
        } else if let Some(caps) = location_re().captures(line) {
            if let Some(frame) = frames.last_mut() {
                let line_no = caps[2].parse().unwrap_or(0);
                frame.file = Some((caps[1].to_string(), line_no));
            }
        }
    }
    frames
}

fn is_hidden(symbol: &str) -> bool {
    HIDDEN_PREFIXES.iter().any(|prefix| symbol.starts_with(prefix))
}

impl TraceConfig {
    fn root(&self) -> Option<String> {
        self.root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .map(|root| root.to_string_lossy().into_owned())
    }

    /// Shorten `path` to a project-relative form.
    pub fn shorten(&self, path: &str) -> String {
        let stripped = self
            .root()
            .and_then(|root| {
                let root = root.trim_end_matches('/').to_string() + "/";
                path.strip_prefix(root.as_str()).map(str::to_string)
            })
            .unwrap_or_else(|| path.to_string());
        stripped.trim_start_matches("./").to_string()
    }

    /// Render a trace for a failure recorded at `caller`.
    pub fn capture(&self, caller: &Location<'_>) -> String {
        let mut buf = format!(
            "\tat {}:line {}\n",
            self.shorten(caller.file()),
            caller.line()
        );

        let backtrace = if self.force_backtrace {
            Backtrace::force_capture()
        } else {
            Backtrace::capture()
        };
        if backtrace.status() != BacktraceStatus::Captured {
            return buf;
        }

        for frame in parse_frames(&backtrace.to_string()) {
            if is_hidden(&frame.symbol) {
                continue;
            }
            match frame.file {
                Some((file, line)) => {
                    buf.push_str(&format!(
                        "\tat {} in {}:line {}\n",
                        frame.symbol,
                        self.shorten(&file),
                        line
                    ));
                }
                // Frames without debug info carry no file to show.
                None => continue,
            }
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDERED: &str = "   0: tickrun::executor::context::Context::check
             at ./src/executor/context.rs:80:20
   1: selftest::arithmetic::test_division
             at /home/dev/game/tests/arith.rs:12:5
   2: core::ops::function::FnOnce::call_once
             at /rustc/abc/library/core/src/ops/function.rs:250:5
   3: __libc_start_main";

    #[test]
    fn parses_symbols_and_locations() {
        let frames = parse_frames(RENDERED);
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[1].symbol, "selftest::arithmetic::test_division");
        assert_eq!(
            frames[1].file,
            Some(("/home/dev/game/tests/arith.rs".to_string(), 12))
        );
        assert!(frames[3].file.is_none());
    }

    #[test]
    fn hides_engine_and_runtime_frames() {
        let visible: Vec<_> = parse_frames(RENDERED)
            .into_iter()
            .filter(|f| !is_hidden(&f.symbol))
            .map(|f| f.symbol)
            .collect();
        assert_eq!(visible, vec!["selftest::arithmetic::test_division"]);
    }

    #[test]
    fn shortens_paths_under_the_root() {
        let config = TraceConfig {
            root: Some(PathBuf::from("/home/dev/game")),
            force_backtrace: false,
        };
        assert_eq!(config.shorten("/home/dev/game/tests/arith.rs"), "tests/arith.rs");
        assert_eq!(config.shorten("./src/lib.rs"), "src/lib.rs");
        assert_eq!(config.shorten("/elsewhere/x.rs"), "/elsewhere/x.rs");
    }

    #[test]
    fn trace_starts_at_the_caller() {
        let config = TraceConfig::default();
        let trace = config.capture(Location::caller());
        assert!(trace.starts_with("\tat "));
        assert!(trace.contains(":line "));
    }

    #[test]
    fn every_trace_line_is_terminated() {
        let config = TraceConfig {
            force_backtrace: true,
            ..TraceConfig::default()
        };
        let caller = Location::caller();
        let trace = config.capture(caller);
        assert!(trace.ends_with('\n'));
        let first = trace.lines().next().unwrap();
        assert_eq!(first, format!("\tat src/trace.rs:line {}", caller.line()));
        assert!(trace.lines().all(|line| line.starts_with("\tat ")));
    }
}
