//! Cross-reference validation
//!
//! Runs on a fully deserialized [`Config`]. Everything checked here is
//! well-typed already; the questions are whether the pieces point at each
//! other correctly: selectors naming existing entries, enabled backends
//! having artifacts for the dataset that will be served, category lists
//! being usable.
//!
//! Validation collects ALL issues (doesn't stop at first) and never fails by
//! itself. Callers decide which severities are fatal.

use crate::config::schema::{CLASSIFIER_NAMES, Config, DatasetConfig, EMBEDDING_NAMES, Selector};
use crate::error::{Severity, ValidationIssue};

use std::collections::HashSet;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default, Clone)]
pub struct ValidationResult {
    /// Issues in the order they were found.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any error-severity issues.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Returns `true` if no issue was found at all.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Error-severity issues.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    /// Warning-severity issues.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }
}

/// Checks cross references in a loaded configuration.
///
/// Returns zero or more issues; an empty list means the configuration is
/// consistent.
#[must_use]
pub fn validate_cross_references(config: &Config) -> Vec<ValidationIssue> {
    Validator::new().validate(config).issues
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    issues: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns the result.
    pub fn validate(&mut self, config: &Config) -> ValidationResult {
        self.issues.clear();

        self.validate_embedding_selector(config);
        self.validate_dataset_selector(config);
        self.validate_classifier_selector(config);
        self.validate_training_artifacts(config);

        for (name, dataset) in &config.datasets.entries {
            self.validate_categories(name, dataset);
        }

        ValidationResult {
            issues: std::mem::take(&mut self.issues),
        }
    }

    // ========================================================================
    // Selectors
    // ========================================================================

    fn validate_embedding_selector(&mut self, config: &Config) {
        let embeddings = &config.word_embeddings;
        let Selector::Named(name) = &embeddings.default else {
            return;
        };
        if embeddings.get(name).is_some() {
            return;
        }

        let defined = embeddings.defined();
        let message = if EMBEDDING_NAMES.contains(&name.as_str()) {
            format!("Word embedding '{name}' is selected but has no entry")
        } else {
            format!(
                "Unknown word embedding '{name}'. Defined: {}{}",
                list_or_none(&defined),
                did_you_mean(name, defined.iter().copied())
            )
        };
        self.add_error("word_embeddings.default", &message);
    }

    fn validate_dataset_selector(&mut self, config: &Config) {
        let datasets = &config.datasets;
        match &datasets.default {
            Selector::Disabled => {
                self.add_warning(
                    "datasets.default",
                    "No default dataset selected; callers must name one explicitly",
                );
            }
            Selector::Named(name) if !datasets.entries.contains_key(name) => {
                let defined: Vec<&str> = datasets.entries.keys().map(String::as_str).collect();
                self.add_error(
                    "datasets.default",
                    &format!(
                        "Unknown dataset '{name}'. Defined: {}{}",
                        list_or_none(&defined),
                        did_you_mean(name, defined.iter().copied())
                    ),
                );
            }
            Selector::Named(_) => {}
        }
    }

    fn validate_classifier_selector(&mut self, config: &Config) {
        let classifier = &config.classifier;
        let enabled: Vec<&str> = classifier.enabled_backends().map(|b| b.name).collect();

        if enabled.is_empty() {
            self.add_warning("classifier", "No classifier backend is enabled");
        }

        let Selector::Named(name) = &classifier.default else {
            return;
        };
        if name == "all" {
            return;
        }
        if !CLASSIFIER_NAMES.contains(&name.as_str()) {
            self.add_error(
                "classifier.default",
                &format!(
                    "Unknown classifier '{name}'. Expected one of: {}, all{}",
                    CLASSIFIER_NAMES.join(", "),
                    did_you_mean(name, CLASSIFIER_NAMES.into_iter().chain(["all"]))
                ),
            );
        } else if !enabled.contains(&name.as_str()) {
            self.add_warning(
                "classifier.default",
                &format!("Default classifier '{name}' is not enabled"),
            );
        }
    }

    // ========================================================================
    // Backends
    // ========================================================================

    /// Every enabled backend needs an artifact for the dataset it will serve.
    fn validate_training_artifacts(&mut self, config: &Config) {
        let served = config.datasets.default.name();

        for backend in config.classifier.enabled_backends() {
            let path = format!("classifier.{}.{}", backend.name, backend.artifact_key);

            if backend.artifacts.is_empty() {
                self.add_error(
                    &path,
                    &format!(
                        "Backend '{}' is enabled but has no {} entries",
                        backend.name, backend.artifact_key
                    ),
                );
                continue;
            }

            if let Some(dataset) = served {
                if !backend.artifacts.contains_key(dataset) {
                    self.add_error(
                        &path,
                        &format!(
                            "Backend '{}' is enabled but has no {} for dataset '{dataset}'",
                            backend.name, backend.artifact_key
                        ),
                    );
                }
            }

            for dataset in backend.artifacts.keys() {
                if !config.datasets.entries.contains_key(dataset) {
                    self.add_warning(
                        &format!("{path}.{dataset}"),
                        &format!("Artifact registered for undefined dataset '{dataset}'"),
                    );
                }
            }
        }
    }

    // ========================================================================
    // Datasets
    // ========================================================================

    fn validate_categories(&mut self, name: &str, dataset: &DatasetConfig) {
        let Some(categories) = &dataset.categories else {
            return;
        };
        let path = format!("datasets.{name}.categories");

        if categories.is_empty() {
            self.add_error(&path, "Category list cannot be empty");
            return;
        }

        let mut seen = HashSet::new();
        for (idx, label) in categories.iter().enumerate() {
            if label.trim().is_empty() {
                self.add_error(&format!("{path}[{idx}]"), "Category label cannot be empty");
            } else if !seen.insert(label.as_str()) {
                self.add_error(
                    &format!("{path}[{idx}]"),
                    &format!("Duplicate category '{label}'"),
                );
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.issues.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.issues.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

fn list_or_none(names: &[&str]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

/// Suggests the closest candidate when its Damerau-Levenshtein distance is ≤ 3.
fn did_you_mean<'a>(input: &str, candidates: impl Iterator<Item = &'a str>) -> String {
    candidates
        .map(|c| (c, strsim::damerau_levenshtein(input, c)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| format!(". Did you mean '{name}'?"))
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{
        ClassifierConfig, CnnBackend, DatasetsConfig, GloveConfig, ModelBackend, ServerConfig,
        Word2VecConfig, WordEmbeddingsConfig,
    };
    use indexmap::IndexMap;
    use std::path::PathBuf;

    fn dataset(categories: Option<Vec<&str>>) -> DatasetConfig {
        DatasetConfig {
            categories: categories.map(|c| c.into_iter().map(String::from).collect()),
            container_path: None,
            shuffle: true,
            random_state: Some(42),
            files: IndexMap::new(),
        }
    }

    fn artifacts(names: &[&str]) -> IndexMap<String, PathBuf> {
        names
            .iter()
            .map(|n| ((*n).to_string(), PathBuf::from(format!("data/{n}.pkl"))))
            .collect()
    }

    fn minimal_config() -> Config {
        Config {
            server: ServerConfig {
                host: "localhost".to_string(),
                port: 3333,
                timeout: None,
            },
            classifier: ClassifierConfig {
                default: Selector::Disabled,
                bayesian: Some(ModelBackend {
                    enabled: true,
                    training_file: artifacts(&["mrpolarity", "20newsgroup"]),
                }),
                svm: None,
                cnn: None,
            },
            word_embeddings: WordEmbeddingsConfig {
                default: Selector::from("word2vec"),
                word2vec: Some(Word2VecConfig {
                    path: PathBuf::from("GoogleNews-vectors-negative300.bin"),
                    dimension: 300,
                    binary: true,
                }),
                glove: Some(GloveConfig {
                    path: PathBuf::from("glove.6B.100d.txt"),
                    dimension: 100,
                    length: Some(400_000),
                }),
            },
            datasets: DatasetsConfig {
                default: Selector::from("20newsgroup"),
                entries: [
                    ("mrpolarity".to_string(), dataset(None)),
                    (
                        "20newsgroup".to_string(),
                        dataset(Some(vec!["alt.atheism", "sci.med"])),
                    ),
                ]
                .into_iter()
                .collect(),
            },
            result_dir: None,
        }
    }

    fn paths(result: &ValidationResult) -> Vec<&str> {
        result.issues.iter().map(|i| i.path.as_str()).collect()
    }

    #[test]
    fn test_validate_minimal_config() {
        let result = Validator::new().validate(&minimal_config());
        assert!(result.is_clean(), "{:?}", result.issues);
    }

    #[test]
    fn test_unknown_embedding_selector() {
        let mut config = minimal_config();
        config.word_embeddings.default = Selector::from("fasttext");

        let result = Validator::new().validate(&config);
        assert!(result.has_errors());
        let issue = result.errors().next().unwrap();
        assert_eq!(issue.path, "word_embeddings.default");
        assert!(issue.message.contains("fasttext"));
        assert!(issue.message.contains("word2vec, glove"));
    }

    #[test]
    fn test_embedding_selector_suggests_close_name() {
        let mut config = minimal_config();
        config.word_embeddings.default = Selector::from("word2vc");

        let issues = validate_cross_references(&config);
        assert!(issues[0].message.contains("Did you mean 'word2vec'?"));
    }

    #[test]
    fn test_selected_embedding_without_entry() {
        let mut config = minimal_config();
        config.word_embeddings.default = Selector::from("glove");
        config.word_embeddings.glove = None;

        let issues = validate_cross_references(&config);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("has no entry"));
    }

    #[test]
    fn test_disabled_embeddings_are_fine() {
        let mut config = minimal_config();
        config.word_embeddings = WordEmbeddingsConfig::default();
        assert!(validate_cross_references(&config).is_empty());
    }

    #[test]
    fn test_unknown_dataset_selector() {
        let mut config = minimal_config();
        config.datasets.default = Selector::from("20newsgroups");

        let result = Validator::new().validate(&config);
        assert!(paths(&result).contains(&"datasets.default"));
        assert!(
            result
                .errors()
                .any(|e| e.message.contains("Did you mean '20newsgroup'?"))
        );
    }

    #[test]
    fn test_disabled_dataset_selector_warns() {
        let mut config = minimal_config();
        config.datasets.default = Selector::Disabled;

        let result = Validator::new().validate(&config);
        assert!(!result.has_errors());
        assert_eq!(result.warnings().count(), 1);
    }

    #[test]
    fn test_enabled_backend_missing_served_dataset() {
        let mut config = minimal_config();
        config.classifier.svm = Some(ModelBackend {
            enabled: true,
            training_file: artifacts(&["mrpolarity"]),
        });

        let result = Validator::new().validate(&config);
        let issue = result
            .errors()
            .find(|e| e.path == "classifier.svm.training_file")
            .expect("missing svm artifact issue");
        assert!(issue.message.contains("'20newsgroup'"));
    }

    #[test]
    fn test_disabled_backend_missing_dataset_is_ignored() {
        let mut config = minimal_config();
        config.classifier.svm = Some(ModelBackend {
            enabled: false,
            training_file: artifacts(&["mrpolarity"]),
        });
        assert!(validate_cross_references(&config).is_empty());
    }

    #[test]
    fn test_cnn_checks_training_dir() {
        let mut config = minimal_config();
        config.classifier.cnn = Some(CnnBackend {
            enabled: true,
            batch_size: Some(64),
            training_dir: IndexMap::new(),
            allow_soft_placement: true,
            log_device_placement: false,
        });

        let result = Validator::new().validate(&config);
        assert!(paths(&result).contains(&"classifier.cnn.training_dir"));
    }

    #[test]
    fn test_artifact_for_undefined_dataset_warns() {
        let mut config = minimal_config();
        config.classifier.bayesian = Some(ModelBackend {
            enabled: true,
            training_file: artifacts(&["20newsgroup", "imdb"]),
        });

        let result = Validator::new().validate(&config);
        assert!(!result.has_errors());
        assert_eq!(
            paths(&result),
            vec!["classifier.bayesian.training_file.imdb"]
        );
    }

    #[test]
    fn test_no_enabled_backend_warns() {
        let mut config = minimal_config();
        config.classifier = ClassifierConfig::default();

        let result = Validator::new().validate(&config);
        assert!(!result.has_errors());
        assert_eq!(paths(&result), vec!["classifier"]);
    }

    #[test]
    fn test_classifier_selector() {
        let mut config = minimal_config();

        config.classifier.default = Selector::from("all");
        assert!(validate_cross_references(&config).is_empty());

        config.classifier.default = Selector::from("svm");
        let issues = validate_cross_references(&config);
        assert_eq!(issues[0].severity, Severity::Warning);

        config.classifier.default = Selector::from("bayes");
        let issues = validate_cross_references(&config);
        assert_eq!(issues[0].severity, Severity::Error);
        assert!(issues[0].message.contains("Did you mean"));
    }

    #[test]
    fn test_empty_category_list() {
        let mut config = minimal_config();
        config
            .datasets
            .entries
            .insert("empty".to_string(), dataset(Some(vec![])));

        let result = Validator::new().validate(&config);
        assert_eq!(paths(&result), vec!["datasets.empty.categories"]);
    }

    #[test]
    fn test_duplicate_categories() {
        let mut config = minimal_config();
        config.datasets.entries.insert(
            "dup".to_string(),
            dataset(Some(vec!["sci.med", "comp.graphics", "sci.med", ""])),
        );

        let result = Validator::new().validate(&config);
        assert_eq!(
            paths(&result),
            vec!["datasets.dup.categories[2]", "datasets.dup.categories[3]"]
        );
    }

    #[test]
    fn test_validate_collects_all_issues() {
        let mut config = minimal_config();
        config.word_embeddings.default = Selector::from("fasttext");
        config.datasets.default = Selector::from("imdb");
        config
            .datasets
            .entries
            .insert("empty".to_string(), dataset(Some(vec![])));

        let result = Validator::new().validate(&config);
        // embedding, dataset selector, bayesian artifact, empty categories
        assert!(result.errors().count() >= 4);
    }
}
