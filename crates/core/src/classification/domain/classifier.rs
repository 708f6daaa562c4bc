use thiserror::Error;

use crate::features::domain::feature_vector::FeatureVector;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("model expects {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("model returned malformed output: {0}")]
    MalformedOutput(String),
}

/// Raw model output for one feature vector.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Predicted class index, in the model's own label space.
    pub label: i64,
    /// Probability per class, in the model's class order, summing to 1.
    pub probabilities: Vec<f64>,
}

/// Domain interface for a pre-trained classifier.
///
/// Models are immutable once loaded; implementations that need exclusive
/// access to a runtime session must synchronise internally.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError>;

    /// Number of classes the model scores, when known up front.
    fn class_count(&self) -> Option<usize> {
        None
    }
}
