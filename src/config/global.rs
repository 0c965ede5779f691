//! Process-wide configuration
//!
//! The configuration is installed once at startup and read everywhere else.
//! There is no reload; a new configuration means a new process.

use std::sync::{Arc, OnceLock};

use crate::config::schema::Config;
use crate::error::ConfigError;

static PROCESS_CONFIG: OnceLock<Arc<Config>> = OnceLock::new();

/// Installs the configuration for the rest of the process lifetime.
///
/// # Errors
///
/// Returns [`ConfigError::AlreadyInstalled`] if a configuration was
/// installed before.
pub fn install(config: Arc<Config>) -> Result<(), ConfigError> {
    PROCESS_CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInstalled)?;
    tracing::debug!("process configuration installed");
    Ok(())
}

/// Returns the installed configuration, if any.
#[must_use]
pub fn get() -> Option<Arc<Config>> {
    PROCESS_CONFIG.get().cloned()
}
