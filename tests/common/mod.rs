//! Shared integration-test helpers for running the `textclass` binary and
//! locating fixture files.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};

/// Thin wrapper around the compiled `textclass` binary.
pub struct TextClassCli;

impl TextClassCli {
    /// Returns the path to a file under `tests/fixtures`.
    #[must_use]
    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    /// Runs the binary to completion with `args` and captures its output.
    ///
    /// Logging is silenced through `TEXTCLASS_LOG_LEVEL` so stderr only
    /// carries the final error line.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_command(args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_textclass"))
            .args(args)
            .env("TEXTCLASS_LOG_LEVEL", "off")
            .env_remove("TEXTCLASS_CONFIG")
            .output()
            .expect("failed to run textclass")
    }

    /// Runs `config <subcommand>` against a fixture file.
    #[allow(clippy::missing_panics_doc)]
    pub fn config_on_fixture(subcommand: &str, fixture: &str, extra: &[&str]) -> Output {
        let path = Self::fixture_path(fixture);
        let path = path.to_str().expect("non-UTF-8 fixture path");
        let mut args = vec!["config", subcommand];
        if subcommand == "show" {
            args.push("--config");
        }
        args.push(path);
        args.extend_from_slice(extra);
        Self::spawn_command(&args)
    }
}
