//! Optional `tickrun.toml` configuration for a harness directory.
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{clock::Pacing, errors, trace::TraceConfig};

/// Name of the configuration file looked up in the harness directory.
pub const CONFIG_FILE: &str = "tickrun.toml";

/// Configuration for a single tickrun run.
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Version of the tickrun crate this configuration is compatible with.
    pub ver: String,
    /// Seed for the test order. Random when unset.
    pub seed: Option<u64>,
    /// Pause before TearDown when a test fails.
    #[serde(default)]
    pub break_on_failure: bool,
    /// Pacing variants in frames per second; `0` is realtime.
    #[serde(default)]
    pub pacing: Vec<u32>,
    /// Ticks per second under realtime pacing.
    pub tick_rate: Option<u32>,
    /// Move on to the next stage once the current one is done.
    #[serde(default)]
    pub chain_stages: bool,
    /// Prefix stripped from file paths in traces.
    pub trace_root: Option<PathBuf>,
    /// Capture backtraces even when `RUST_BACKTRACE` is unset.
    #[serde(default)]
    pub force_backtrace: bool,
}

impl Config {
    /// Read `tickrun.toml` from `conf_dir`, if there is one.
    pub fn from_path(conf_dir: &Path) -> Result<Option<Self>, errors::TickError> {
        let conf_path = conf_dir.join(CONFIG_FILE);
        if !conf_path.exists() {
            tracing::debug!(path = %conf_path.display(), "no configuration file");
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&conf_path).map_err(|err| {
            errors::TickError(format!("{}: {}", conf_path.display(), err))
        })?;
        Self::parse(&contents, &conf_path).map(Some)
    }

    /// Parse configuration text. `origin` only shows up in errors.
    pub fn parse(contents: &str, origin: &Path) -> Result<Self, errors::TickError> {
        let conf: Config = toml::from_str(contents).map_err(|err| {
            errors::TickError(format!("Failed to parse {}: {}", origin.display(), err))
        })?;

        // Check if the current `tickrun` matches the version specified in
        // the configuration.
        if env!("CARGO_PKG_VERSION") != conf.ver {
            return Err(errors::TickError(format!(
                "tickrun version mismatch. Configuration requires: {}, crate version: {}.",
                conf.ver,
                env!("CARGO_PKG_VERSION")
            )));
        }

        Ok(conf)
    }

    /// Pacing variants, or `None` when the file leaves the default.
    pub fn pacings(&self) -> Option<Vec<Pacing>> {
        if self.pacing.is_empty() {
            None
        } else {
            Some(self.pacing.iter().copied().map(Pacing::from_fps).collect())
        }
    }

    pub fn trace_config(&self) -> TraceConfig {
        TraceConfig {
            root: self.trace_root.clone(),
            force_backtrace: self.force_backtrace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_a_full_config() {
        let text = format!(
            "ver = \"{}\"\nseed = 9\nbreak_on_failure = true\npacing = [0, 30]\n\
             tick_rate = 120\ntrace_root = \"/work\"\n",
            env!("CARGO_PKG_VERSION")
        );
        let conf = Config::parse(&text, Path::new("tickrun.toml")).unwrap();
        assert_eq!(conf.seed, Some(9));
        assert!(conf.break_on_failure);
        assert_eq!(
            conf.pacings(),
            Some(vec![Pacing::Realtime, Pacing::Fixed { fps: 30 }])
        );
        assert_eq!(conf.tick_rate, Some(120));
        assert_eq!(conf.trace_config().root, Some(PathBuf::from("/work")));
        assert!(!conf.chain_stages);
    }

    #[test]
    fn rejects_other_versions() {
        let err = Config::parse("ver = \"0.0.0-old\"", Path::new("x.toml")).unwrap_err();
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = std::env::temp_dir().join("tickrun-no-config-here");
        assert_eq!(Config::from_path(&dir).unwrap(), None);
    }
}
