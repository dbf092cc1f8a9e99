//! Shared logging helpers and CLI argument definitions for the workspace.
//!
//! - [`LogArgs`]: `--trace`, `--debug`, `--log-level`, `--log-filter`
//! - [`compute_spec`]: resolve those flags (and `RUST_LOG`) into a filter
//! - [`init_stderr`]: install a stderr `fmt` subscriber once per process

use std::{env, io, sync::OnceLock};

use clap::Args;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry};

/// Logging controls for CLI apps.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Set global log level to trace (our crates only)
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Set global log level to debug (our crates only)
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Set a single global log level for our crates (error|warn|info|debug|trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Set an explicit tracing filter directive (overrides other flags)
    /// e.g. "dispatch=trace,expander=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl LogArgs {
    /// Resolve these flags into a filter spec.
    pub fn spec(&self) -> String {
        compute_spec(
            self.trace,
            self.debug,
            self.log_level.as_deref(),
            self.log_filter.as_deref(),
        )
    }
}

/// List of crate targets that constitute "our" logs.
pub fn our_crates() -> &'static [&'static str] {
    &[
        // Core
        "keyspec",
        "triggers",
        "dispatch",
        "expander",
        // Apps
        "replay",
        // Utilities
        "logging",
    ]
}

/// Build a filter directive string that sets the same `level` for all of our crates.
pub fn level_spec_for(level: &str) -> String {
    let lvl = level.to_ascii_lowercase();
    our_crates()
        .iter()
        .map(|t| format!("{}={}", t, lvl))
        .collect::<Vec<_>>()
        .join(",")
}

/// Compute the final filter spec string with precedence:
/// - `log_filter`
/// - `trace`/`debug`/`log_level` (crate-scoped)
/// - `RUST_LOG` env
/// - default to crate-scoped `info`
pub fn compute_spec(
    trace: bool,
    debug: bool,
    log_level: Option<&str>,
    log_filter: Option<&str>,
) -> String {
    if let Some(spec) = log_filter {
        return spec.to_string();
    }
    if trace {
        return level_spec_for("trace");
    }
    if debug {
        return level_spec_for("debug");
    }
    if let Some(lvl) = log_level {
        return level_spec_for(lvl);
    }
    env::var("RUST_LOG").unwrap_or_else(|_| level_spec_for("info"))
}

/// Create an `EnvFilter` from a spec string.
pub fn env_filter_from_spec(spec: &str) -> EnvFilter {
    EnvFilter::new(spec)
}

/// Tracks whether a subscriber has been installed by this crate.
static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install a stderr subscriber filtered by `spec`.
///
/// Only the first call in a process has an effect; a subscriber installed
/// elsewhere is left alone.
pub fn init_stderr(spec: &str) {
    INSTALLED.get_or_init(|| {
        registry()
            .with(env_filter_from_spec(spec))
            .with(fmt::layer().with_writer(io::stderr).without_time())
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins() {
        assert_eq!(compute_spec(true, false, None, Some("x=warn")), "x=warn");
    }

    #[test]
    fn level_applies_to_every_crate() {
        let spec = compute_spec(false, false, Some("DEBUG"), None);
        for c in our_crates() {
            assert!(spec.contains(&format!("{c}=debug")));
        }
        assert_eq!(spec.split(',').count(), our_crates().len());
    }

    #[test]
    fn trace_flag() {
        assert!(compute_spec(true, false, None, None).contains("dispatch=trace"));
    }
}
