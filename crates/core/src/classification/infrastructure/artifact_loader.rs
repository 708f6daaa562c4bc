use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::{error, info, warn};
use thiserror::Error;

use crate::classification::domain::class_label_map::{ClassLabelMap, LabelMapError};
use crate::classification::domain::classifier::Classifier;
use crate::classification::infrastructure::linear_classifier::{LinearClassifier, LinearModelError};
use crate::classification::infrastructure::onnx_classifier::OnnxClassifier;
use crate::shared::constants::{CLASS_DICTIONARY_NAME, DEFAULT_MODEL_NAME};

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error(transparent)]
    LabelMap(#[from] LabelMapError),
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),
    #[error("failed to load linear model {path}: {source}")]
    LinearModel {
        path: PathBuf,
        #[source]
        source: LinearModelError,
    },
    #[error("failed to load ONNX model {path}: {message}")]
    OnnxModel { path: PathBuf, message: String },
    #[error("unsupported model format {0} (expected .onnx or .json)")]
    UnsupportedModelFormat(PathBuf),
    #[error("no artifact locations configured")]
    NotConfigured,
}

/// Locations of the class dictionary and the trained model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub class_dictionary: PathBuf,
    pub model: PathBuf,
}

impl ArtifactPaths {
    /// Standard layout: `class_dictionary.json` and `model_file` in `dir`.
    pub fn in_dir(dir: &Path, model_file: &str) -> Self {
        Self {
            class_dictionary: dir.join(CLASS_DICTIONARY_NAME),
            model: dir.join(model_file),
        }
    }

    pub fn default_in(dir: &Path) -> Self {
        Self::in_dir(dir, DEFAULT_MODEL_NAME)
    }
}

/// Everything classification needs once startup is done.
pub struct Artifacts {
    pub labels: ClassLabelMap,
    pub classifier: Box<dyn Classifier>,
}

impl Artifacts {
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let labels = ClassLabelMap::from_file(&paths.class_dictionary)?;
        let classifier = load_model(&paths.model)?;

        if let Some(classes) = classifier.class_count() {
            if classes != labels.len() {
                warn!(
                    "Model scores {classes} classes but the class dictionary lists {}",
                    labels.len()
                );
            }
        }
        Ok(Self { labels, classifier })
    }
}

/// Picks the model reader from the file extension.
pub fn load_model(path: &Path) -> Result<Box<dyn Classifier>, ArtifactError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("onnx") | Some("json") if !path.is_file() => {
            Err(ArtifactError::ModelNotFound(path.to_path_buf()))
        }
        Some("onnx") => OnnxClassifier::new(path)
            .map(|c| Box::new(c) as Box<dyn Classifier>)
            .map_err(|e| ArtifactError::OnnxModel {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        Some("json") => LinearClassifier::from_file(path)
            .map(|c| Box::new(c) as Box<dyn Classifier>)
            .map_err(|e| ArtifactError::LinearModel {
                path: path.to_path_buf(),
                source: e,
            }),
        _ => Err(ArtifactError::UnsupportedModelFormat(path.to_path_buf())),
    }
}

/// Loads [`Artifacts`] at most once and hands out shared references.
///
/// A failed load leaves the loader empty; callers then report the model as
/// unavailable. Calling [`ArtifactLoader::load`] again retries.
pub struct ArtifactLoader {
    paths: Option<ArtifactPaths>,
    slot: Mutex<Option<Arc<Artifacts>>>,
}

impl ArtifactLoader {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths: Some(paths),
            slot: Mutex::new(None),
        }
    }

    /// Loader that already holds `artifacts` and never touches the disk.
    pub fn preloaded(artifacts: Artifacts) -> Self {
        Self {
            paths: None,
            slot: Mutex::new(Some(Arc::new(artifacts))),
        }
    }

    /// Loads the artifacts unless they are already loaded.
    ///
    /// The slot lock is held for the whole load, so concurrent callers wait
    /// for the first one instead of loading twice.
    pub fn load(&self) -> Result<Arc<Artifacts>, ArtifactError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(artifacts) = slot.as_ref() {
            return Ok(artifacts.clone());
        }
        let Some(paths) = &self.paths else {
            return Err(ArtifactError::NotConfigured);
        };

        info!(
            "Loading saved artifacts from {} and {}",
            paths.class_dictionary.display(),
            paths.model.display()
        );
        let artifacts = Arc::new(Artifacts::load(paths)?);
        info!(
            "Loaded {} classes from {}",
            artifacts.labels.len(),
            paths.class_dictionary.display()
        );
        *slot = Some(artifacts.clone());
        Ok(artifacts)
    }

    /// Startup variant of [`ArtifactLoader::load`]: logs the failure
    /// instead of returning it.
    pub fn load_or_log(&self) -> bool {
        match self.load() {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to load artifacts, classification unavailable: {e}");
                false
            }
        }
    }

    /// Currently loaded artifacts, without attempting a load.
    pub fn get(&self) -> Option<Arc<Artifacts>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::infrastructure::linear_classifier::tests::diagonal_model_json;
    use std::fs;

    const LABELS: &str = r#"{"ada": 0, "grace": 1, "linus": 2}"#;

    fn artifact_dir(model_name: &str, model: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CLASS_DICTIONARY_NAME), LABELS).unwrap();
        fs::write(dir.path().join(model_name), model).unwrap();
        dir
    }

    #[test]
    fn test_loads_linear_model() {
        let dir = artifact_dir("model.json", &diagonal_model_json());
        let loader = ArtifactLoader::new(ArtifactPaths::in_dir(dir.path(), "model.json"));

        assert!(!loader.is_loaded());
        let artifacts = loader.load().unwrap();
        assert_eq!(artifacts.labels.len(), 3);
        assert_eq!(artifacts.classifier.class_count(), Some(3));
        assert!(loader.is_loaded());
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = artifact_dir("model.json", &diagonal_model_json());
        let loader = ArtifactLoader::new(ArtifactPaths::in_dir(dir.path(), "model.json"));

        let first = loader.load().unwrap();
        // Removing the files proves the second call does not reload.
        fs::remove_file(dir.path().join("model.json")).unwrap();
        let second = loader.load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_concurrent_loads_share_one_instance() {
        let dir = artifact_dir("model.json", &diagonal_model_json());
        let loader = Arc::new(ArtifactLoader::new(ArtifactPaths::in_dir(
            dir.path(),
            "model.json",
        )));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let loader = loader.clone();
                std::thread::spawn(move || loader.load().unwrap())
            })
            .collect();
        let loaded: Vec<Arc<Artifacts>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(loaded.iter().all(|a| Arc::ptr_eq(a, &loaded[0])));
    }

    #[test]
    fn test_missing_dictionary_leaves_loader_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ArtifactLoader::new(ArtifactPaths::default_in(dir.path()));
        assert!(matches!(
            loader.load(),
            Err(ArtifactError::LabelMap(LabelMapError::Io { .. }))
        ));
        assert!(!loader.load_or_log());
        assert!(loader.get().is_none());
    }

    #[test]
    fn test_missing_model_file() {
        let dir = artifact_dir("other.json", "{}");
        let loader = ArtifactLoader::new(ArtifactPaths::in_dir(dir.path(), "model.json"));
        assert!(matches!(loader.load(), Err(ArtifactError::ModelNotFound(_))));
    }

    #[test]
    fn test_unsupported_model_format() {
        let dir = artifact_dir("saved_model.pkl", "pickle bytes");
        let loader = ArtifactLoader::new(ArtifactPaths::in_dir(dir.path(), "saved_model.pkl"));
        assert!(matches!(
            loader.load(),
            Err(ArtifactError::UnsupportedModelFormat(_))
        ));
    }

    #[test]
    fn test_malformed_linear_model() {
        let dir = artifact_dir("model.json", r#"{"classes": [0]}"#);
        let loader = ArtifactLoader::new(ArtifactPaths::in_dir(dir.path(), "model.json"));
        assert!(matches!(
            loader.load(),
            Err(ArtifactError::LinearModel { .. })
        ));
    }

    #[test]
    fn test_preloaded_loader() {
        let labels = ClassLabelMap::from_json(LABELS).unwrap();
        let classifier = LinearClassifier::from_json(&diagonal_model_json()).unwrap();
        let loader = ArtifactLoader::preloaded(Artifacts {
            labels,
            classifier: Box::new(classifier),
        });
        assert!(loader.is_loaded());
        assert!(loader.load().is_ok());
    }
}
