//! Configuration loader
//!
//! This module implements the configuration loading pipeline:
//! 1. Size check and UTF-8 BOM removal
//! 2. Environment variable expansion (pre-parse, on raw text)
//! 3. YAML parsing
//! 4. Schema pass (required keys, scalar coercion)
//! 5. Deserialization to typed config
//! 6. Cross-reference validation
//! 7. Freeze with `Arc`

use crate::config::coercion::SchemaPass;
use crate::config::schema::Config;
use crate::config::validation::Validator;
use crate::error::{ConfigError, Severity, ValidationIssue};

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Limits for configuration size.
    pub config_limits: ConfigLimits,

    /// Fail the load when a validation issue of at least this severity is
    /// found. `None` reports issues without failing.
    pub fail_on: Option<Severity>,
}

/// Limits for configuration size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration document size in bytes.
    pub max_config_size: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("TEXTCLASS_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration document.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded configuration, frozen for sharing.
    pub config: Arc<Config>,

    /// Warnings encountered during loading (env vars, unknown keys).
    pub warnings: Vec<LoadWarning>,

    /// Cross-reference issues found in the loaded configuration.
    pub issues: Vec<ValidationIssue>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Configuration loader.
///
/// Handles the full loading pipeline from YAML text to frozen [`Config`].
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a new configuration loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - YAML parsing fails or the document is empty
    /// - A required key is missing or a value has the wrong type
    /// - Validation issues reach the configured `fail_on` severity
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let limit = self.options.config_limits.max_config_size;
        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > limit {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
                size: file_size,
                limit,
            });
        }

        let raw = std::fs::read(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let source_name = path.display().to_string();
        let text = String::from_utf8(raw).map_err(|e| ConfigError::ParseError {
            source_name: source_name.clone(),
            line: None,
            message: format!("configuration is not valid UTF-8: {e}"),
        })?;

        self.load_document(&text, &source_name)
    }

    /// Loads a configuration from an in-memory YAML string.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigLoader::load`], minus file access.
    pub fn load_from_str(&self, yaml: &str) -> Result<LoadResult, ConfigError> {
        let limit = self.options.config_limits.max_config_size;
        if yaml.len() > limit {
            return Err(ConfigError::TooLarge {
                path: "<string>".into(),
                size: yaml.len(),
                limit,
            });
        }
        self.load_document(yaml, "<string>")
    }

    /// Loads a configuration from a byte stream.
    ///
    /// At most `max_config_size + 1` bytes are read.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigLoader::load`]; read failures surface as
    /// [`ConfigError::ParseError`].
    pub fn load_from_reader<R: Read>(&self, reader: R) -> Result<LoadResult, ConfigError> {
        let limit = self.options.config_limits.max_config_size;
        let mut text = String::new();
        reader
            .take(u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1))
            .read_to_string(&mut text)
            .map_err(|e| ConfigError::ParseError {
                source_name: "<reader>".to_string(),
                line: None,
                message: format!("failed to read configuration: {e}"),
            })?;
        if text.len() > limit {
            return Err(ConfigError::TooLarge {
                path: "<reader>".into(),
                size: text.len(),
                limit,
            });
        }
        self.load_document(&text, "<reader>")
    }

    fn load_document(&self, raw: &str, source_name: &str) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();

        // Handle UTF-8 BOM
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        // Stage 1: Environment variable substitution (before YAML parsing)
        let mut env_sub = EnvSubstitution::new(source_name);
        let substituted = env_sub.substitute(raw)?;
        warnings.extend(env_sub.warnings);
        tracing::debug!(source = source_name, "environment substitution done");

        // Stage 2: YAML parsing
        let mut root: Value =
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                source_name: source_name.to_string(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        if root.is_null() {
            return Err(ConfigError::ParseError {
                source_name: source_name.to_string(),
                line: None,
                message: "Configuration document is empty".to_string(),
            });
        }

        // Stage 3: required keys and scalar coercion
        let mut schema_pass = SchemaPass::new();
        schema_pass.run(&mut root)?;
        warnings.extend(schema_pass.warnings);
        tracing::debug!(source = source_name, "schema pass done");

        // Stage 4: Deserialize to typed config
        let config = deserialize_sections(root)?;

        // Stage 5: Cross-reference validation
        let result = Validator::new().validate(&config);
        if let Some(threshold) = self.options.fail_on {
            let failing: Vec<ValidationIssue> = result
                .issues
                .iter()
                .filter(|issue| issue.severity >= threshold)
                .cloned()
                .collect();
            if !failing.is_empty() {
                return Err(ConfigError::ValidationFailed {
                    source_name: source_name.to_string(),
                    issues: failing,
                });
            }
        }

        tracing::info!(
            source = source_name,
            datasets = config.datasets.entries.len(),
            issues = result.issues.len(),
            "configuration loaded"
        );

        // Stage 6: Freeze
        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
            issues: result.issues,
        })
    }
}

/// Deserializes each top-level section on its own so a failure names it.
fn deserialize_sections(root: Value) -> Result<Config, ConfigError> {
    let Value::Mapping(mut root) = root else {
        return Err(ConfigError::schema(
            "",
            "expected a mapping at the document root",
        ));
    };

    let server = take_section(&mut root, "server")?
        .ok_or_else(|| ConfigError::schema("server", "missing required key"))?;
    let datasets = take_section(&mut root, "datasets")?
        .ok_or_else(|| ConfigError::schema("datasets", "missing required key"))?;

    Ok(Config {
        server,
        classifier: take_section(&mut root, "classifier")?.unwrap_or_default(),
        word_embeddings: take_section(&mut root, "word_embeddings")?.unwrap_or_default(),
        datasets,
        result_dir: take_section(&mut root, "result_dir")?,
    })
}

fn take_section<T: DeserializeOwned>(
    root: &mut Mapping,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    root.remove(key)
        .filter(|value| !value.is_null())
        .map(|value| {
            serde_yaml::from_value(value).map_err(|e| ConfigError::schema(key, e.to_string()))
        })
        .transpose()
}

// ============================================================================
// Serialization
// ============================================================================

impl Config {
    /// Serializes the configuration back to YAML.
    ///
    /// Literal `$` characters are written as `$$` so the output passes
    /// through environment substitution unchanged when loaded again.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        Ok(serde_yaml::to_string(self)?.replace('$', "$$"))
    }
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Pre-parse environment variable substitution.
///
/// Runs on raw YAML text BEFORE parsing to preserve type inference.
struct EnvSubstitution<'a> {
    source_name: &'a str,
    warnings: Vec<LoadWarning>,
}

impl<'a> EnvSubstitution<'a> {
    const fn new(source_name: &'a str) -> Self {
        Self {
            source_name,
            warnings: Vec::new(),
        }
    }

    /// Substitutes environment variables in raw YAML text.
    ///
    /// Supports:
    /// - `${VAR}` - expand to value (empty string if unset with warning)
    /// - `${VAR:-default}` - expand to default if unset
    /// - `${VAR:?message}` - fail if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw_yaml: &str) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw_yaml.len());
        let mut chars = raw_yaml.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let spec = self.read_until_close(&mut chars)?;
                    self.expand(&spec, &mut result)?;
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }

    /// Expands one `${...}` body into `out`.
    fn expand(&mut self, spec: &str, out: &mut String) -> Result<(), ConfigError> {
        let (var_name, fallback) = match spec.split_once(':') {
            Some((name, rest)) if rest.starts_with('-') || rest.starts_with('?') => {
                (name, Some(rest.split_at(1)))
            }
            _ => (spec, None),
        };

        if let Ok(value) = std::env::var(var_name) {
            out.push_str(&value);
            return Ok(());
        }

        match fallback {
            Some(("-", default)) => out.push_str(default),
            Some((_, message)) => {
                return Err(ConfigError::EnvVarNotSet {
                    var: var_name.to_string(),
                    message: message.to_string(),
                });
            }
            None => self.warnings.push(LoadWarning {
                message: format!("Environment variable '{var_name}' is not set, using empty string"),
                location: Some(self.source_name.to_string()),
            }),
        }
        Ok(())
    }

    /// Reads content until the closing `}`, handling nested braces.
    fn read_until_close(
        &self,
        chars: &mut std::iter::Peekable<std::str::Chars>,
    ) -> Result<String, ConfigError> {
        let mut value = String::new();
        let mut depth = 1;

        for c in chars.by_ref() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(value);
                    }
                }
                _ => {}
            }
            value.push(c);
        }

        Err(ConfigError::ParseError {
            source_name: self.source_name.to_string(),
            line: None,
            message: format!("Unclosed environment variable reference: ${{{value}"),
        })
    }
}

/// Reads a usize from an environment variable, falling back to `default`.
fn env_or(var: &str, default: usize) -> usize {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r"
server:
  host: localhost
  port: 3333
classifier:
  svm:
    enabled: true
    training_file:
      mrpolarity: data/svm-mrpolarity.pkl
datasets:
  default: mrpolarity
  mrpolarity:
    positive_data_file:
      path: data/rt-polarity.pos
";

    #[test]
    fn test_env_substitution_simple() {
        // Use PATH which is always set on Unix/Windows
        let mut sub = EnvSubstitution::new("test.yaml");
        let result = sub.substitute("path: ${PATH}").unwrap();
        assert!(!result.contains("${PATH}"));
        assert!(result.starts_with("path: "));
        assert!(result.len() > "path: ".len());
    }

    #[test]
    fn test_env_substitution_default() {
        let mut sub = EnvSubstitution::new("test.yaml");
        let result = sub
            .substitute("host: ${TEXTCLASS_TEST_NONEXISTENT_VAR_XYZ123:-0.0.0.0}")
            .unwrap();
        assert_eq!(result, "host: 0.0.0.0");
    }

    #[test]
    fn test_env_substitution_required_missing() {
        let mut sub = EnvSubstitution::new("test.yaml");
        let result = sub.substitute("port: ${TEXTCLASS_TEST_REQUIRED_XYZ123:?port must be set}");
        match result {
            Err(ConfigError::EnvVarNotSet { var, message }) => {
                assert_eq!(var, "TEXTCLASS_TEST_REQUIRED_XYZ123");
                assert_eq!(message, "port must be set");
            }
            other => panic!("Expected EnvVarNotSet error, got {other:?}"),
        }
    }

    #[test]
    fn test_env_substitution_escaped_dollar() {
        let mut sub = EnvSubstitution::new("test.yaml");
        let result = sub.substitute("path: /data/$$HOME").unwrap();
        assert_eq!(result, "path: /data/$HOME");
    }

    #[test]
    fn test_env_substitution_missing_warning() {
        let mut sub = EnvSubstitution::new("test.yaml");
        let result = sub.substitute("value: ${TEXTCLASS_TEST_WARN_XYZ123}").unwrap();
        assert_eq!(result, "value: ");
        assert_eq!(sub.warnings.len(), 1);
        assert!(sub.warnings[0].message.contains("TEXTCLASS_TEST_WARN_XYZ123"));
    }

    #[test]
    fn test_env_substitution_unclosed() {
        let mut sub = EnvSubstitution::new("test.yaml");
        let result = sub.substitute("value: ${OPEN");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_load_from_str() {
        let loader = ConfigLoader::with_defaults();
        let result = loader.load_from_str(DOC).unwrap();
        assert_eq!(result.config.server.port, 3333);
        assert!(result.warnings.is_empty());
        assert!(result.issues.is_empty(), "{:?}", result.issues);
    }

    #[test]
    fn test_load_from_reader() {
        let loader = ConfigLoader::with_defaults();
        let result = loader.load_from_reader(DOC.as_bytes()).unwrap();
        assert_eq!(result.config.server.host, "localhost");
    }

    #[test]
    fn test_empty_document_is_parse_error() {
        let loader = ConfigLoader::with_defaults();
        let result = loader.load_from_str("# only a comment\n");
        match result {
            Err(ConfigError::ParseError { message, .. }) => assert!(message.contains("empty")),
            other => panic!("Expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let loader = ConfigLoader::with_defaults();
        let result = loader.load_from_str("server: [unclosed\n");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_bom_is_stripped() {
        let loader = ConfigLoader::with_defaults();
        let doc = format!("\u{feff}{DOC}");
        assert!(loader.load_from_str(&doc).is_ok());
    }

    #[test]
    fn test_size_limit() {
        let loader = ConfigLoader::new(LoaderOptions {
            config_limits: ConfigLimits { max_config_size: 16 },
            fail_on: None,
        });
        assert!(matches!(
            loader.load_from_str(DOC),
            Err(ConfigError::TooLarge { limit: 16, .. })
        ));
        assert!(matches!(
            loader.load_from_reader(DOC.as_bytes()),
            Err(ConfigError::TooLarge { limit: 16, .. })
        ));
    }

    #[test]
    fn test_fail_on_error_severity() {
        let doc = DOC.replace("default: mrpolarity", "default: 20newsgroup");
        let lenient = ConfigLoader::with_defaults().load_from_str(&doc).unwrap();
        assert!(!lenient.issues.is_empty());

        let strict = ConfigLoader::new(LoaderOptions {
            fail_on: Some(Severity::Error),
            ..LoaderOptions::default()
        });
        match strict.load_from_str(&doc) {
            Err(ConfigError::ValidationFailed { issues, .. }) => {
                assert!(issues.iter().all(|i| i.severity == Severity::Error));
            }
            other => panic!("Expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_to_yaml_escapes_dollar() {
        let doc = DOC.replace("data/rt-polarity.pos", "data/$$price.pos");
        let loaded = ConfigLoader::with_defaults().load_from_str(&doc).unwrap();
        let file = &loaded.config.datasets.entries["mrpolarity"].files["positive_data_file"];
        assert_eq!(file.path, std::path::PathBuf::from("data/$price.pos"));

        let yaml = loaded.config.to_yaml().unwrap();
        assert!(yaml.contains("data/$$price.pos"));
        let reloaded = ConfigLoader::with_defaults().load_from_str(&yaml).unwrap();
        assert_eq!(reloaded.config, loaded.config);
    }

    #[test]
    fn test_config_limits_default() {
        let limits = ConfigLimits::default();
        assert!(limits.max_config_size >= 1024);
    }

    #[test]
    fn test_null_optional_values_take_defaults() {
        let doc = r"
server:
  host: localhost
  port: 3333
  timeout:
classifier:
  cnn:
    enabled: false
    allow_soft_placement:
    log_device_placement:
word_embeddings:
  default: word2vec
  word2vec:
    path: data/GoogleNews-vectors-negative300.bin
    dimension: 300
    binary:
datasets:
  default: mrpolarity
  mrpolarity:
    shuffle:
    random_state:
";
        let loaded = ConfigLoader::with_defaults().load_from_str(doc).unwrap();
        let config = &loaded.config;
        assert_eq!(config.server.timeout(), None);
        assert!(config.word_embeddings.word2vec.as_ref().unwrap().binary);
        let cnn = config.classifier.cnn.as_ref().unwrap();
        assert!(!cnn.allow_soft_placement);
        let dataset = &config.datasets.entries["mrpolarity"];
        assert!(dataset.shuffle);
        assert_eq!(dataset.random_state, None);
    }

    #[test]
    fn test_oversized_timeout_is_schema_error() {
        let result = ConfigLoader::with_defaults()
            .load_from_str("server:\n  host: h\n  port: 1\n  timeout: 1e20\ndatasets:\n  d: {}\n");
        match result {
            Err(err @ ConfigError::SchemaError { .. }) => {
                assert_eq!(err.key_path(), Some("server.timeout"));
            }
            other => panic!("Expected SchemaError, got {other:?}"),
        }
    }

    #[test]
    fn test_typed_failure_names_its_section() {
        let root: Value =
            serde_yaml::from_str("server:\n  host: h\n  port: [1]\ndatasets:\n  d: {}\n")
                .unwrap();
        let err = deserialize_sections(root).unwrap_err();
        assert_eq!(err.key_path(), Some("server"));
    }
}
