use serde::Serialize;

use crate::classification::domain::class_label_map::ClassLabelMap;
use crate::classification::domain::crop_outcome::CropOutcome;
use crate::shared::region::Region;

/// One entry of a classification response, in the shape clients consume.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationResult {
    #[serde(skip)]
    pub region: Option<Region>,
    #[serde(rename = "class")]
    pub class: Option<String>,
    pub class_probability: Vec<f64>,
    pub class_dictionary: ClassLabelMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClassificationResult {
    pub fn from_outcome(region: Region, outcome: CropOutcome, labels: &ClassLabelMap) -> Self {
        match outcome {
            CropOutcome::Predicted {
                class,
                probabilities,
            } => Self {
                region: Some(region),
                class: Some(class),
                class_probability: probabilities,
                class_dictionary: labels.clone(),
                error: None,
            },
            CropOutcome::Failed(message) => Self {
                region: Some(region),
                ..Self::error(message)
            },
        }
    }

    /// Error entry: null class, no probabilities, empty dictionary.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            region: None,
            class: None,
            class_probability: Vec::new(),
            class_dictionary: ClassLabelMap::default(),
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
