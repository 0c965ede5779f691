//! Configuration schema types
//!
//! Typed view of the text-classification service configuration. These types
//! are deserialized from YAML after the schema pass in
//! [`crate::config::coercion`] has checked required keys and scalar types,
//! so the serde attributes here only describe shape and defaults.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Listening address of the classification server
    pub server: ServerConfig,

    /// Classifier backends
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Word-embedding sources
    #[serde(default)]
    pub word_embeddings: WordEmbeddingsConfig,

    /// Dataset definitions (at least one entry)
    pub datasets: DatasetsConfig,

    /// Directory receiving training results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_dir: Option<PathBuf>,
}

// ============================================================================
// Server
// ============================================================================

/// Server bind settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Hostname or IP address
    pub host: String,

    /// TCP port
    pub port: u16,

    /// Socket timeout in seconds; absent means no timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}

impl ServerConfig {
    /// Returns the socket timeout, or `None` for blocking sockets.
    ///
    /// Values that do not fit a [`Duration`] are rejected at load time; a
    /// hand-built config with such a value also reads as `None`.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Returns `host:port` suitable for binding.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Selectors
// ============================================================================

/// A `default:` field naming one sibling entry, or nothing.
///
/// An empty string, `null`, or an absent key all mean [`Selector::Disabled`].
/// That is a feature toggle and never an error by itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selector {
    /// No entry selected
    #[default]
    Disabled,
    /// The named sibling entry is active
    Named(String),
}

impl Selector {
    /// Returns the selected name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Disabled => None,
            Self::Named(name) => Some(name),
        }
    }

    /// Returns `true` when nothing is selected.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Self::Disabled
        } else {
            Self::Named(trimmed.to_string())
        }
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name().unwrap_or(""))
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Disabled, Self::from))
    }
}

// ============================================================================
// Classifiers
// ============================================================================

/// Backend names accepted by `classifier.default` besides `all`.
pub const CLASSIFIER_NAMES: [&str; 3] = ["bayesian", "svm", "cnn"];

/// Classifier backend settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Backend used by training runs (`bayesian`, `svm`, `cnn` or `all`)
    #[serde(default, skip_serializing_if = "Selector::is_disabled")]
    pub default: Selector,

    /// Naive Bayes backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bayesian: Option<ModelBackend>,

    /// Linear SVM backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svm: Option<ModelBackend>,

    /// Convolutional network backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnn: Option<CnnBackend>,
}

impl ClassifierConfig {
    /// Iterates over enabled backends as `(name, per-dataset artifacts)`.
    pub fn enabled_backends(&self) -> impl Iterator<Item = EnabledBackend<'_>> {
        let bayesian = self
            .bayesian
            .as_ref()
            .filter(|b| b.enabled)
            .map(|b| EnabledBackend {
                name: "bayesian",
                artifact_key: "training_file",
                artifacts: &b.training_file,
            });
        let svm = self
            .svm
            .as_ref()
            .filter(|b| b.enabled)
            .map(|b| EnabledBackend {
                name: "svm",
                artifact_key: "training_file",
                artifacts: &b.training_file,
            });
        let cnn = self
            .cnn
            .as_ref()
            .filter(|b| b.enabled)
            .map(|b| EnabledBackend {
                name: "cnn",
                artifact_key: "training_dir",
                artifacts: &b.training_dir,
            });
        bayesian.into_iter().chain(svm).chain(cnn)
    }
}

/// Borrowed view of one enabled backend and its per-dataset artifacts.
#[derive(Debug, Clone, Copy)]
pub struct EnabledBackend<'a> {
    /// Backend name (`bayesian`, `svm`, `cnn`)
    pub name: &'static str,
    /// Key holding the artifacts (`training_file` or `training_dir`)
    pub artifact_key: &'static str,
    /// Dataset name to artifact path
    pub artifacts: &'a IndexMap<String, PathBuf>,
}

/// Bayesian or SVM backend: one pickled model per dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelBackend {
    /// Whether the backend serves predictions
    pub enabled: bool,

    /// Dataset name to trained-model file
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub training_file: IndexMap<String, PathBuf>,
}

/// CNN backend: one checkpoint directory per dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CnnBackend {
    /// Whether the backend serves predictions
    pub enabled: bool,

    /// Evaluation batch size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,

    /// Dataset name to checkpoint directory
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub training_dir: IndexMap<String, PathBuf>,

    /// Let the runtime fall back to another device
    #[serde(default)]
    pub allow_soft_placement: bool,

    /// Log the device each operation is placed on
    #[serde(default)]
    pub log_device_placement: bool,
}

// ============================================================================
// Word Embeddings
// ============================================================================

/// Embedding algorithm names known to the schema.
pub const EMBEDDING_NAMES: [&str; 2] = ["word2vec", "glove"];

/// Word-embedding sources and the active one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WordEmbeddingsConfig {
    /// Active algorithm; disabled means no embeddings are loaded
    #[serde(default)]
    pub default: Selector,

    /// word2vec vectors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word2vec: Option<Word2VecConfig>,

    /// `GloVe` vectors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glove: Option<GloveConfig>,
}

impl WordEmbeddingsConfig {
    /// Looks up an embedding entry by algorithm name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Embedding<'_>> {
        match name {
            "word2vec" => self.word2vec.as_ref().map(Embedding::Word2Vec),
            "glove" => self.glove.as_ref().map(Embedding::Glove),
            _ => None,
        }
    }

    /// Returns the entry named by `default`, if it exists.
    #[must_use]
    pub fn active(&self) -> Option<Embedding<'_>> {
        self.default.name().and_then(|name| self.get(name))
    }

    /// Names of the algorithm entries that are present.
    #[must_use]
    pub fn defined(&self) -> Vec<&'static str> {
        EMBEDDING_NAMES
            .into_iter()
            .filter(|name| self.get(name).is_some())
            .collect()
    }
}

/// Borrowed view of one embedding entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Embedding<'a> {
    /// word2vec entry
    Word2Vec(&'a Word2VecConfig),
    /// `GloVe` entry
    Glove(&'a GloveConfig),
}

impl Embedding<'_> {
    /// Path of the vectors file.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Word2Vec(c) => &c.path,
            Self::Glove(c) => &c.path,
        }
    }

    /// Vector dimension.
    #[must_use]
    pub const fn dimension(&self) -> u32 {
        match self {
            Self::Word2Vec(c) => c.dimension,
            Self::Glove(c) => c.dimension,
        }
    }
}

/// word2vec embedding file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word2VecConfig {
    /// Vectors file
    pub path: PathBuf,
    /// Vector dimension
    pub dimension: u32,
    /// File is in the binary word2vec format
    #[serde(default = "default_true")]
    pub binary: bool,
}

/// `GloVe` embedding file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GloveConfig {
    /// Vectors file
    pub path: PathBuf,
    /// Vector dimension
    pub dimension: u32,
    /// Vocabulary length (number of lines in the file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
}

// ============================================================================
// Datasets
// ============================================================================

/// Dataset definitions and the active one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetsConfig {
    /// Active dataset
    #[serde(default)]
    pub default: Selector,

    /// Every other key under `datasets` is a dataset entry
    #[serde(flatten)]
    pub entries: IndexMap<String, DatasetConfig>,
}

impl DatasetsConfig {
    /// Looks up a dataset by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DatasetConfig> {
        self.entries.get(name)
    }

    /// Returns `(name, entry)` for the dataset named by `default`.
    #[must_use]
    pub fn active(&self) -> Option<(&str, &DatasetConfig)> {
        let name = self.default.name()?;
        self.entries
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
    }
}

/// One dataset entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Category labels; absent means derived from `container_path` subfolders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    /// Directory whose subfolders are the categories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_path: Option<PathBuf>,

    /// Shuffle samples when loading
    #[serde(default = "default_true")]
    pub shuffle: bool,

    /// Seed for shuffling; absent means nondeterministic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_state: Option<u64>,

    /// Individual data files keyed by role (e.g. `positive_data_file`)
    #[serde(flatten)]
    pub files: IndexMap<String, DataFile>,
}

impl DatasetConfig {
    /// How the category labels of this dataset are obtained.
    #[must_use]
    pub fn category_source(&self) -> CategorySource<'_> {
        match (&self.categories, &self.container_path) {
            (Some(list), _) => CategorySource::Listed(list),
            (None, Some(dir)) => CategorySource::Subfolders(dir),
            (None, None) => CategorySource::Unspecified,
        }
    }
}

/// Where a dataset's categories come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySource<'a> {
    /// Explicit label list
    Listed(&'a [String]),
    /// One category per subfolder of the container directory
    Subfolders(&'a std::path::Path),
    /// Left to the dataset loader (e.g. fixed positive/negative files)
    Unspecified,
}

/// A single data file belonging to a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFile {
    /// File location
    pub path: PathBuf,
    /// Human description
    #[serde(
        default,
        alias = "description",
        skip_serializing_if = "Option::is_none"
    )]
    pub info: Option<String>,
}

const fn default_true() -> bool {
    true
}

// ============================================================================
// Tests
// ============================================================================
