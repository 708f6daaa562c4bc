use log::warn;

use crate::classification::domain::class_label_map::ClassLabelMap;
use crate::classification::domain::classifier::Classifier;
use crate::features::domain::feature_vector::FeatureVector;

/// Result of classifying a single face crop.
#[derive(Clone, Debug, PartialEq)]
pub enum CropOutcome {
    Predicted {
        class: String,
        /// Percentages rounded to two decimals, in model class order.
        probabilities: Vec<f64>,
    },
    Failed(String),
}

/// Runs the classifier on one crop's features and names the result.
///
/// A prediction error only fails this crop.
pub fn classify_crop(
    classifier: &dyn Classifier,
    labels: &ClassLabelMap,
    features: &FeatureVector,
) -> CropOutcome {
    match classifier.predict(features) {
        Ok(prediction) => CropOutcome::Predicted {
            class: labels.label_for(prediction.label).to_string(),
            probabilities: to_percentages(&prediction.probabilities),
        },
        Err(e) => {
            warn!("Prediction failed for face crop: {e}");
            CropOutcome::Failed(format!("Error processing image: {e}"))
        }
    }
}

/// Scales probabilities to percent and rounds to two decimals
/// (half-to-even on the scaled value).
pub fn to_percentages(probabilities: &[f64]) -> Vec<f64> {
    probabilities
        .iter()
        .map(|p| (p * 100.0 * 100.0).round_ties_even() / 100.0)
        .collect()
}
