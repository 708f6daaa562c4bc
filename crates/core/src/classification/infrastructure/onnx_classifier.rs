//! Classifier exported to ONNX, run with ONNX Runtime via `ort`.
//!
//! Expects the layout produced by scikit-learn converters with the ZipMap
//! disabled: one float input `[1, F]`, output 0 the predicted label
//! (int64) and output 1 the class probabilities (float `[1, C]`).

use std::path::Path;
use std::sync::Mutex;

use log::debug;
use ndarray::Array2;

use crate::classification::domain::classifier::{Classifier, ClassifierError, Prediction};
use crate::features::domain::feature_vector::FeatureVector;

pub struct OnnxClassifier {
    session: Mutex<ort::session::Session>,
    feature_count: Option<usize>,
    class_count: Option<usize>,
}

impl OnnxClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let feature_count = session.inputs().first().and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                (shape.len() == 2 && shape[1] > 0).then(|| shape[1] as usize)
            } else {
                None
            }
        });
        let class_count = session.outputs().get(1).and_then(|output| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = output.dtype() {
                (shape.len() == 2 && shape[1] > 0).then(|| shape[1] as usize)
            } else {
                None
            }
        });
        debug!(
            "ONNX classifier {}: {:?} features, {:?} classes",
            model_path.display(),
            feature_count,
            class_count
        );

        Ok(Self {
            session: Mutex::new(session),
            feature_count,
            class_count,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError> {
        if let Some(expected) = self.feature_count {
            if expected != features.len() {
                return Err(ClassifierError::FeatureMismatch {
                    expected,
                    actual: features.len(),
                });
            }
        }

        let input = Array2::from_shape_vec((1, features.len()), features.to_f32())
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let input_value = ort::value::Tensor::from_array(input)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ClassifierError::Inference(format!("Lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        if outputs.len() < 2 {
            return Err(ClassifierError::MalformedOutput(format!(
                "expected label and probability outputs, got {}",
                outputs.len()
            )));
        }

        let labels = outputs[0]
            .try_extract_array::<i64>()
            .map_err(|e| ClassifierError::MalformedOutput(e.to_string()))?;
        let label = *labels
            .iter()
            .next()
            .ok_or_else(|| ClassifierError::MalformedOutput("empty label output".into()))?;

        let probs = outputs[1]
            .try_extract_array::<f32>()
            .map_err(|e| ClassifierError::MalformedOutput(e.to_string()))?;
        let probabilities: Vec<f64> = probs.iter().map(|&p| p as f64).collect();
        if probabilities.is_empty() {
            return Err(ClassifierError::MalformedOutput("empty probability output".into()));
        }

        Ok(Prediction {
            label,
            probabilities,
        })
    }

    fn class_count(&self) -> Option<usize> {
        self.class_count
    }
}

/// Platform execution providers; ONNX Runtime falls back to CPU when the
/// preferred one is unavailable.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}
