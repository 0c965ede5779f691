//! Error types for `textclass`
//!
//! Three failure classes come out of configuration handling: the document is
//! not YAML at all (`ParseError`), it is YAML but does not fit the schema
//! (`SchemaError`), or it fits the schema but its cross references are off
//! (`ValidationIssue`, which is reported rather than raised).

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `textclass` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// Configuration error (invalid YAML, schema or validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `textclass` operations.
///
/// Aggregates the domain errors and maps each of them to an exit code.
#[derive(Debug, Error)]
pub enum TextClassError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// One or more files failed `config validate`
    #[error("{failed} of {total} configuration file(s) failed validation")]
    Invalid {
        /// Files that failed
        failed: usize,
        /// Files checked
        total: usize,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TextClassError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) | Self::Config(ConfigError::MissingFile { .. }) => ExitCode::IO_ERROR,
            Self::Config(_) | Self::Invalid { .. } | Self::Json(_) | Self::Yaml(_) => {
                ExitCode::CONFIG_ERROR
            }
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading errors.
///
/// Every variant is fatal for the load that produced it. Non-fatal findings
/// travel as [`ValidationIssue`] instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not well-formed YAML, or is empty
    #[error("parse error in {source_name}{}: {message}", .line.map(|l| format!(" (line {l})")).unwrap_or_default())]
    ParseError {
        /// File path or `<string>` / `<reader>` for in-memory sources
        source_name: String,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// A required key is missing or a value does not coerce to its type
    #[error("schema error at '{path}': {reason}")]
    SchemaError {
        /// Dotted key path of the offending entry (e.g. `server.port`)
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// Configuration validation failed under a strict policy
    #[error("validation failed for {source_name}: {} issue(s)", .issues.len())]
    ValidationFailed {
        /// File path or in-memory source label
        source_name: String,
        /// Issues that caused the failure
        issues: Vec<ValidationIssue>,
    },

    /// Configuration file not found or unreadable
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Configuration file exceeds the size limit
    #[error("{path} is {size} bytes, limit is {limit} bytes")]
    TooLarge {
        /// Path to the file
        path: PathBuf,
        /// Actual file size
        size: usize,
        /// Configured limit
        limit: usize,
    },

    /// Environment variable referenced with `${VAR:?msg}` is not set
    #[error("environment variable '{var}' not set ({message})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Message supplied after `:?`
        message: String,
    },

    /// The process-wide configuration has already been installed
    #[error("process configuration is already installed")]
    AlreadyInstalled,
}

impl ConfigError {
    /// Builds a [`ConfigError::SchemaError`].
    pub fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the offending key path for schema errors.
    #[must_use]
    pub fn key_path(&self) -> Option<&str> {
        match self {
            Self::SchemaError { path, .. } => Some(path),
            _ => None,
        }
    }
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single cross-reference problem found in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dotted key path to the problematic field (e.g. `datasets.default`)
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} at {}", self.severity, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Potential issue that leaves the configuration usable
    Warning,
    /// The configuration cannot serve what it claims to serve
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}
