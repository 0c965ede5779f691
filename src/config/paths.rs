//! Path anchoring
//!
//! Configuration files refer to models, checkpoints and corpora with paths
//! relative to wherever the service was started. [`resolve_paths`] pins them
//! to an explicit base directory so the config can be handed to code running
//! with a different working directory.

use std::path::{Path, PathBuf};

use crate::config::schema::Config;

/// Returns a copy of `config` with every relative path joined onto `base_dir`.
///
/// Rewritten fields: `classifier.{bayesian,svm}.training_file.*`,
/// `classifier.cnn.training_dir.*`, `word_embeddings.*.path`,
/// `datasets.*.container_path`, `datasets.*.<file>.path` and `result_dir`.
/// Absolute paths are left untouched, so applying this twice with the same
/// base is the same as applying it once.
///
/// A relative `base_dir` is first made absolute against the current working
/// directory. The filesystem is never touched.
#[must_use]
pub fn resolve_paths(config: &Config, base_dir: &Path) -> Config {
    let base = std::path::absolute(base_dir).unwrap_or_else(|_| base_dir.to_path_buf());
    let mut resolved = config.clone();

    let classifier = &mut resolved.classifier;
    for backend in [&mut classifier.bayesian, &mut classifier.svm]
        .into_iter()
        .flatten()
    {
        backend
            .training_file
            .values_mut()
            .for_each(|p| anchor(p, &base));
    }
    if let Some(cnn) = &mut classifier.cnn {
        cnn.training_dir.values_mut().for_each(|p| anchor(p, &base));
    }

    let embeddings = &mut resolved.word_embeddings;
    if let Some(word2vec) = &mut embeddings.word2vec {
        anchor(&mut word2vec.path, &base);
    }
    if let Some(glove) = &mut embeddings.glove {
        anchor(&mut glove.path, &base);
    }

    for dataset in resolved.datasets.entries.values_mut() {
        if let Some(container) = &mut dataset.container_path {
            anchor(container, &base);
        }
        for file in dataset.files.values_mut() {
            anchor(&mut file.path, &base);
        }
    }

    if let Some(result_dir) = &mut resolved.result_dir {
        anchor(result_dir, &base);
    }

    resolved
}

fn anchor(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}
