//! Version information display
//!
//! Prints version metadata in human or JSON format.

use std::io::Write;

use crate::cli::args::{OutputFormat, VersionArgs};
use crate::error::TextClassError;

/// Print version information.
///
/// # Errors
///
/// Returns an I/O error if stdout cannot be written.
pub fn run(args: &VersionArgs) -> Result<(), TextClassError> {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");
    let mut out = std::io::stdout().lock();

    match args.format {
        OutputFormat::Human => writeln!(out, "{name} {version}")?,
        OutputFormat::Json => {
            let info = serde_json::json!({ "name": name, "version": version });
            writeln!(out, "{info}")?;
        }
    }
    Ok(())
}
