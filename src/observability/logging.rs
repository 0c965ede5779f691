//! Logging setup for the `textclass` binary.
//!
//! Logs go to stderr so stdout stays clean for `config show` and JSON
//! reports. `-v` raises the level of this crate only; dependencies stay at
//! `warn` until `-vvv`. `TEXTCLASS_LOG_LEVEL` replaces the computed filter
//! entirely.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable holding a full `tracing` filter directive.
pub const LOG_LEVEL_ENV: &str = "TEXTCLASS_LOG_LEVEL";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON.
    Json,
}

/// Builds the filter directive for a `-v` count.
///
/// An override that is present and non-blank wins over `verbosity`.
#[must_use]
pub fn filter_directive(verbosity: u8, env_override: Option<&str>) -> String {
    if let Some(directive) = env_override.map(str::trim).filter(|d| !d.is_empty()) {
        return directive.to_string();
    }
    let crate_name = env!("CARGO_CRATE_NAME");
    match verbosity {
        0 => "warn".to_string(),
        1 => format!("warn,{crate_name}=info"),
        2 => format!("warn,{crate_name}=debug"),
        _ => "trace".to_string(),
    }
}

/// Decides whether human output gets ANSI escapes.
#[must_use]
pub const fn use_ansi(color: ColorChoice, stderr_is_terminal: bool, no_color: bool) -> bool {
    match color {
        ColorChoice::Auto => stderr_is_terminal && !no_color,
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    }
}

/// Installs the global tracing subscriber.
///
/// A malformed `TEXTCLASS_LOG_LEVEL` falls back to the `-v` based filter.
/// Uses `try_init()`, so a second call is a no-op.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let env_override = std::env::var(LOG_LEVEL_ENV).ok();
    let filter = EnvFilter::try_new(filter_directive(verbosity, env_override.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity, None)));

    // Module targets only help once debug output is on.
    let show_target = verbosity >= 2;

    match format {
        LogFormat::Human => {
            let ansi = use_ansi(
                color,
                std::io::stderr().is_terminal(),
                std::env::var_os("NO_COLOR").is_some(),
            );
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(ansi)
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
