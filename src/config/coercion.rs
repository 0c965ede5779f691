//! Schema pass over the raw YAML tree
//!
//! Runs between YAML parsing and typed deserialization. It walks the generic
//! `serde_yaml::Value` so that every failure can name the exact key path
//! (`classifier.cnn.batch_size`) instead of the line/column that serde
//! reports, and it normalizes scalars on the way:
//!
//! - integer fields accept numeric strings (`port: "3333"`)
//! - boolean fields accept `"true"` / `"false"` in any case
//! - selector values and category labels accept bare numbers
//! - dataset names and artifact keys are always strings
//!
//! Keys the schema does not know about are reported as load warnings and
//! then ignored by deserialization.

use std::time::Duration;

use serde_yaml::{Mapping, Value};

use crate::config::loader::LoadWarning;
use crate::error::ConfigError;

const TOP_LEVEL_KEYS: &[&str] = &[
    "server",
    "classifier",
    "word_embeddings",
    "datasets",
    "result_dir",
];
const SERVER_KEYS: &[&str] = &["host", "port", "timeout"];
const CLASSIFIER_KEYS: &[&str] = &["default", "bayesian", "svm", "cnn"];
const MODEL_BACKEND_KEYS: &[&str] = &["enabled", "training_file"];
const CNN_KEYS: &[&str] = &[
    "enabled",
    "batch_size",
    "training_dir",
    "allow_soft_placement",
    "log_device_placement",
];
const EMBEDDING_KEYS: &[&str] = &["default", "word2vec", "glove"];
const DATASET_RESERVED_KEYS: &[&str] = &["categories", "container_path", "shuffle", "random_state"];
const DATA_FILE_KEYS: &[&str] = &["path", "info", "description"];

/// Checks required keys and scalar types, normalizing values in place.
///
/// Collects warnings for unknown keys; stops at the first schema error.
#[derive(Debug, Default)]
pub struct SchemaPass {
    /// Unknown-key warnings gathered during the pass
    pub warnings: Vec<LoadWarning>,
}

impl SchemaPass {
    /// Creates an empty pass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the pass over a parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SchemaError`] naming the first offending key
    /// path when a required key is missing or a value cannot be coerced.
    pub fn run(&mut self, root: &mut Value) -> Result<(), ConfigError> {
        let root = as_mapping(root, "")?;
        self.warn_unknown(root, "", TOP_LEVEL_KEYS);

        let server = require(root, "", "server")?;
        self.check_server(as_mapping(server, "server")?)?;

        if let Some(classifier) = present(root, "classifier") {
            self.check_classifier(as_mapping(classifier, "classifier")?)?;
        }

        if let Some(embeddings) = present(root, "word_embeddings") {
            self.check_embeddings(as_mapping(embeddings, "word_embeddings")?)?;
        }

        let datasets = require(root, "", "datasets")?;
        self.check_datasets(as_mapping(datasets, "datasets")?)?;

        if let Some(result_dir) = present(root, "result_dir") {
            coerce_string(result_dir, "result_dir")?;
        }

        Ok(())
    }

    // ========================================================================
    // Sections
    // ========================================================================

    fn check_server(&mut self, server: &mut Mapping) -> Result<(), ConfigError> {
        self.warn_unknown(server, "server", SERVER_KEYS);

        coerce_string(require(server, "server", "host")?, "server.host")?;
        coerce_uint(
            require(server, "server", "port")?,
            "server.port",
            0,
            u64::from(u16::MAX),
        )?;
        if let Some(timeout) = present(server, "timeout") {
            coerce_seconds(timeout, "server.timeout")?;
        }
        Ok(())
    }

    fn check_classifier(&mut self, classifier: &mut Mapping) -> Result<(), ConfigError> {
        self.warn_unknown(classifier, "classifier", CLASSIFIER_KEYS);

        if let Some(default) = present(classifier, "default") {
            coerce_label(default, "classifier.default")?;
        }

        for name in ["bayesian", "svm"] {
            let path = format!("classifier.{name}");
            if let Some(backend) = present(classifier, name) {
                let backend = as_mapping(backend, &path)?;
                self.warn_unknown(backend, &path, MODEL_BACKEND_KEYS);
                let enabled = coerce_bool(require(backend, &path, "enabled")?, &format!("{path}.enabled"))?;
                check_artifacts(backend, &path, "training_file", enabled)?;
            }
        }

        if let Some(cnn) = present(classifier, "cnn") {
            let path = "classifier.cnn";
            let cnn = as_mapping(cnn, path)?;
            self.warn_unknown(cnn, path, CNN_KEYS);
            let enabled = coerce_bool(require(cnn, path, "enabled")?, "classifier.cnn.enabled")?;

            match (present(cnn, "batch_size"), enabled) {
                (Some(value), _) => {
                    coerce_uint(value, "classifier.cnn.batch_size", 1, u64::from(u32::MAX))?;
                }
                (None, true) => return Err(missing(path, "batch_size")),
                (None, false) => {}
            }

            check_artifacts(cnn, path, "training_dir", enabled)?;

            for flag in ["allow_soft_placement", "log_device_placement"] {
                match (present(cnn, flag), enabled) {
                    (Some(value), _) => {
                        coerce_bool(value, &format!("{path}.{flag}"))?;
                    }
                    (None, true) => return Err(missing(path, flag)),
                    (None, false) => {}
                }
            }
        }
        Ok(())
    }

    fn check_embeddings(&mut self, embeddings: &mut Mapping) -> Result<(), ConfigError> {
        self.warn_unknown(embeddings, "word_embeddings", EMBEDDING_KEYS);

        if let Some(default) = present(embeddings, "default") {
            coerce_label(default, "word_embeddings.default")?;
        }

        for algo in ["word2vec", "glove"] {
            let path = format!("word_embeddings.{algo}");
            // `glove:` with nothing under it reads as "not configured"
            let Some(entry) = present(embeddings, algo) else {
                continue;
            };
            let entry = as_mapping(entry, &path)?;

            coerce_string(require(entry, &path, "path")?, &format!("{path}.path"))?;
            coerce_uint(
                require(entry, &path, "dimension")?,
                &format!("{path}.dimension"),
                1,
                u64::from(u32::MAX),
            )?;

            let extra = if algo == "word2vec" { "binary" } else { "length" };
            self.warn_unknown(entry, &path, &["path", "dimension", extra]);
            if let Some(value) = present(entry, extra) {
                if extra == "binary" {
                    coerce_bool(value, &format!("{path}.binary"))?;
                } else {
                    coerce_uint(value, &format!("{path}.length"), 0, u64::MAX)?;
                }
            }
        }
        Ok(())
    }

    fn check_datasets(&mut self, datasets: &mut Mapping) -> Result<(), ConfigError> {
        stringify_keys(datasets, "datasets")?;

        if let Some(default) = present(datasets, "default") {
            coerce_label(default, "datasets.default")?;
        }

        let mut entries = 0usize;
        for (key, entry) in datasets.iter_mut() {
            let Some(name) = key.as_str() else { continue };
            if name == "default" {
                continue;
            }
            entries += 1;
            let path = format!("datasets.{name}");
            self.check_dataset(as_mapping(entry, &path)?, &path)?;
        }

        if entries == 0 {
            return Err(ConfigError::schema(
                "datasets",
                "at least one dataset entry is required",
            ));
        }
        Ok(())
    }

    fn check_dataset(&mut self, dataset: &mut Mapping, path: &str) -> Result<(), ConfigError> {
        stringify_keys(dataset, path)?;

        if let Some(categories) = present(dataset, "categories") {
            let categories_path = format!("{path}.categories");
            let Value::Sequence(items) = categories else {
                return Err(ConfigError::schema(
                    categories_path,
                    format!("expected a list of labels, got {}", describe(categories)),
                ));
            };
            for (idx, item) in items.iter_mut().enumerate() {
                coerce_label(item, &format!("{categories_path}[{idx}]"))?;
                if item.is_null() {
                    return Err(ConfigError::schema(
                        format!("{categories_path}[{idx}]"),
                        "category label cannot be empty",
                    ));
                }
            }
        }
        if let Some(container) = present(dataset, "container_path") {
            coerce_string(container, &format!("{path}.container_path"))?;
        }
        if let Some(shuffle) = present(dataset, "shuffle") {
            coerce_bool(shuffle, &format!("{path}.shuffle"))?;
        }
        if let Some(seed) = present(dataset, "random_state") {
            coerce_uint(seed, &format!("{path}.random_state"), 0, u64::MAX)?;
        }

        // Anything else is a data file description.
        for (key, file) in dataset.iter_mut() {
            let Some(role) = key.as_str() else { continue };
            if DATASET_RESERVED_KEYS.contains(&role) {
                continue;
            }
            let file_path = format!("{path}.{role}");
            let file = match file {
                Value::Mapping(map) => map,
                other => {
                    return Err(ConfigError::schema(
                        file_path,
                        format!(
                            "expected a data file mapping with 'path', got {}",
                            describe(other)
                        ),
                    ));
                }
            };
            self.warn_unknown(file, &file_path, DATA_FILE_KEYS);
            coerce_string(require(file, &file_path, "path")?, &format!("{file_path}.path"))?;
            for text in ["info", "description"] {
                if let Some(value) = present(file, text) {
                    coerce_label(value, &format!("{file_path}.{text}"))?;
                }
            }
        }
        Ok(())
    }

    fn warn_unknown(&mut self, map: &Mapping, path: &str, known: &[&str]) {
        for key in map.keys() {
            let name = key
                .as_str()
                .map_or_else(|| describe(key), ToString::to_string);
            if !known.contains(&name.as_str()) {
                let location = join(path, &name);
                tracing::debug!(%location, "ignoring unknown key");
                self.warnings.push(LoadWarning {
                    message: format!("Unknown key '{name}' is ignored"),
                    location: Some(location),
                });
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Validates a `training_file` / `training_dir` map, required when enabled.
fn check_artifacts(
    backend: &mut Mapping,
    path: &str,
    key: &str,
    enabled: bool,
) -> Result<(), ConfigError> {
    let artifacts_path = format!("{path}.{key}");
    let Some(artifacts) = present(backend, key) else {
        return if enabled {
            Err(missing(path, key))
        } else {
            Ok(())
        };
    };

    let artifacts = as_mapping(artifacts, &artifacts_path)?;
    stringify_keys(artifacts, &artifacts_path)?;
    for (dataset, location) in artifacts.iter_mut() {
        let dataset = dataset.as_str().unwrap_or_default();
        coerce_string(location, &format!("{artifacts_path}.{dataset}"))?;
    }
    Ok(())
}

fn join(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}

fn missing(parent: &str, key: &str) -> ConfigError {
    ConfigError::schema(join(parent, key), "missing required key")
}

/// Returns the value under `key` unless it is absent or `null`.
///
/// A `null` entry is removed so the typed defaults apply to it.
fn present<'a>(map: &'a mut Mapping, key: &str) -> Option<&'a mut Value> {
    if map.get(key).is_some_and(Value::is_null) {
        map.remove(key);
    }
    map.get_mut(key)
}

fn require<'a>(map: &'a mut Mapping, parent: &str, key: &str) -> Result<&'a mut Value, ConfigError> {
    present(map, key).ok_or_else(|| missing(parent, key))
}

fn as_mapping<'a>(value: &'a mut Value, path: &str) -> Result<&'a mut Mapping, ConfigError> {
    match value {
        Value::Mapping(map) => Ok(map),
        other => {
            let at = if path.is_empty() { "the document root" } else { path };
            Err(ConfigError::schema(
                path,
                format!("expected a mapping at {at}, got {}", describe(other)),
            ))
        }
    }
}

/// Short human description of a YAML value for error messages.
fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string '{s}'"),
        Value::Sequence(_) => "a list".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(tagged) => format!("tagged value {}", tagged.tag),
    }
}

fn coerce_string(value: &mut Value, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::String(_) => Ok(()),
        other => Err(ConfigError::schema(
            path,
            format!("expected a string, got {}", describe(other)),
        )),
    }
}

/// Accepts strings, numbers and booleans, storing them as strings.
fn coerce_label(value: &mut Value, path: &str) -> Result<(), ConfigError> {
    let text = match value {
        Value::Null | Value::String(_) => return Ok(()),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => {
            return Err(ConfigError::schema(
                path,
                format!("expected a name, got {}", describe(other)),
            ));
        }
    };
    *value = Value::String(text);
    Ok(())
}

fn coerce_bool(value: &mut Value, path: &str) -> Result<bool, ConfigError> {
    let parsed = match value {
        Value::Bool(b) => return Ok(*b),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => true,
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => false,
        other => {
            return Err(ConfigError::schema(
                path,
                format!("expected a boolean, got {}", describe(other)),
            ));
        }
    };
    *value = Value::Bool(parsed);
    Ok(parsed)
}

fn coerce_uint(value: &mut Value, path: &str, min: u64, max: u64) -> Result<u64, ConfigError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    let Some(parsed) = parsed else {
        return Err(ConfigError::schema(
            path,
            format!("expected a non-negative integer, got {}", describe(value)),
        ));
    };
    if parsed < min || parsed > max {
        return Err(ConfigError::schema(
            path,
            format!("{parsed} is out of range {min}..={max}"),
        ));
    }
    *value = Value::Number(parsed.into());
    Ok(parsed)
}

fn coerce_seconds(value: &mut Value, path: &str) -> Result<(), ConfigError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(secs) if secs >= 0.0 && Duration::try_from_secs_f64(secs).is_ok() => {
            if value.is_string() {
                *value = Value::Number(serde_yaml::Number::from(secs));
            }
            Ok(())
        }
        Some(secs) => Err(ConfigError::schema(
            path,
            format!("timeout must be a number of seconds between 0 and {}, got {secs}", Duration::MAX.as_secs()),
        )),
        None => Err(ConfigError::schema(
            path,
            format!("expected a number of seconds, got {}", describe(value)),
        )),
    }
}

/// Rewrites numeric and boolean keys as strings so names stay uniform.
fn stringify_keys(map: &mut Mapping, path: &str) -> Result<(), ConfigError> {
    if map.keys().all(Value::is_string) {
        return Ok(());
    }
    let old = std::mem::take(map);
    for (key, value) in old {
        let key = match key {
            Value::String(_) => key,
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            other => {
                return Err(ConfigError::schema(
                    path,
                    format!("keys must be names, got {}", describe(&other)),
                ));
            }
        };
        map.insert(key, value);
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
