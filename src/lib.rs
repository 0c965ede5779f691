//! `textclass` - configuration layer for a text-classification service
//!
//! Loads the service's YAML configuration (server, classifier backends,
//! word embeddings and datasets), checks its cross references and anchors
//! its relative paths.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;

pub use config::{Config, ConfigLoader, load, resolve_paths, validate_cross_references};
pub use error::{ConfigError, Severity, TextClassError, ValidationIssue};
