//! Configuration module
//!
//! Loads, checks and normalizes the text-classification service
//! configuration: server bind settings, classifier backends, word-embedding
//! sources and dataset definitions.

pub mod coercion;
pub mod global;
pub mod loader;
pub mod paths;
pub mod schema;
pub mod validation;

use std::path::Path;
use std::sync::Arc;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use paths::resolve_paths;
pub use schema::*;
pub use validation::{ValidationResult, Validator, validate_cross_references};

use crate::error::ConfigError;

/// Loads a configuration file with default options and logs what was found.
///
/// Load warnings and validation issues are emitted through `tracing` and do
/// not fail the load.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not YAML, or does not fit
/// the schema.
pub fn load(path: impl AsRef<Path>) -> Result<Arc<Config>, ConfigError> {
    let result = ConfigLoader::with_defaults().load(path.as_ref())?;

    for warning in &result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }
    for issue in &result.issues {
        tracing::warn!(path = %issue.path, severity = %issue.severity, "{}", issue.message);
    }

    Ok(result.config)
}
