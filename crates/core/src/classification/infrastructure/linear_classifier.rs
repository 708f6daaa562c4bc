//! Linear classifier read from a JSON export.
//!
//! The file holds the fitted parameters of a (optionally standardised)
//! logistic-regression style model:
//!
//! ```json
//! {
//!   "classes": [0, 1, 2],
//!   "coef": [[...], [...], [...]],
//!   "intercept": [0.1, -0.2, 0.05],
//!   "multi_class": "multinomial",
//!   "scaler": { "mean": [...], "scale": [...] }
//! }
//! ```
//!
//! A two-class model may carry a single coefficient row, scored with a
//! logistic function for the second class.

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::Deserialize;
use thiserror::Error;

use crate::classification::domain::classifier::{Classifier, ClassifierError, Prediction};
use crate::features::domain::feature_vector::FeatureVector;

#[derive(Error, Debug)]
pub enum LinearModelError {
    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("inconsistent model shape: {0}")]
    Shape(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiClass {
    /// Softmax over all class scores.
    #[default]
    Multinomial,
    /// Independent logistic per class, normalised to sum to one.
    Ovr,
}

#[derive(Deserialize)]
struct ModelFile {
    classes: Vec<i64>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    #[serde(default)]
    multi_class: MultiClass,
    #[serde(default)]
    scaler: Option<ScalerFile>,
}

#[derive(Deserialize)]
struct ScalerFile {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

#[derive(Debug)]
struct Scaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

#[derive(Debug)]
pub struct LinearClassifier {
    classes: Vec<i64>,
    coef: Array2<f64>,
    intercept: Array1<f64>,
    multi_class: MultiClass,
    scaler: Option<Scaler>,
}

impl LinearClassifier {
    pub fn from_file(path: &Path) -> Result<Self, LinearModelError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn from_json(text: &str) -> Result<Self, LinearModelError> {
        let file: ModelFile = serde_json::from_str(text)?;

        let rows = file.coef.len();
        let features = file.coef.first().map_or(0, Vec::len);
        if rows == 0 || features == 0 {
            return Err(LinearModelError::Shape("empty coefficient matrix".into()));
        }
        if let Some(bad) = file.coef.iter().position(|row| row.len() != features) {
            return Err(LinearModelError::Shape(format!(
                "coefficient row {bad} has {} values, expected {features}",
                file.coef[bad].len()
            )));
        }
        if file.intercept.len() != rows {
            return Err(LinearModelError::Shape(format!(
                "{} intercepts for {rows} coefficient rows",
                file.intercept.len()
            )));
        }
        if file.classes.len() < 2 {
            return Err(LinearModelError::Shape(format!(
                "a classifier needs at least 2 classes, got {}",
                file.classes.len()
            )));
        }
        let binary = rows == 1 && file.classes.len() == 2;
        if !binary && file.classes.len() != rows {
            return Err(LinearModelError::Shape(format!(
                "{} classes for {rows} coefficient rows",
                file.classes.len()
            )));
        }

        let scaler = match file.scaler {
            Some(s) => {
                if s.mean.len() != features || s.scale.len() != features {
                    return Err(LinearModelError::Shape(format!(
                        "scaler has {}/{} values, expected {features}",
                        s.mean.len(),
                        s.scale.len()
                    )));
                }
                if s.scale.iter().any(|&v| v == 0.0 || !v.is_finite()) {
                    return Err(LinearModelError::Shape("scaler has a zero scale".into()));
                }
                Some(Scaler {
                    mean: Array1::from(s.mean),
                    scale: Array1::from(s.scale),
                })
            }
            None => None,
        };

        let flat: Vec<f64> = file.coef.into_iter().flatten().collect();
        let coef = Array2::from_shape_vec((rows, features), flat)
            .map_err(|e| LinearModelError::Shape(e.to_string()))?;

        Ok(Self {
            classes: file.classes,
            coef,
            intercept: Array1::from(file.intercept),
            multi_class: file.multi_class,
            scaler,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.coef.ncols()
    }

    fn probabilities(&self, scores: &Array1<f64>) -> Vec<f64> {
        if scores.len() == 1 {
            let p = sigmoid(scores[0]);
            return vec![1.0 - p, p];
        }
        match self.multi_class {
            MultiClass::Multinomial => {
                let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
                let total: f64 = exp.iter().sum();
                exp.into_iter().map(|e| e / total).collect()
            }
            MultiClass::Ovr => {
                let probs: Vec<f64> = scores.iter().map(|&s| sigmoid(s)).collect();
                let total: f64 = probs.iter().sum();
                if total > 0.0 {
                    probs.into_iter().map(|p| p / total).collect()
                } else {
                    vec![1.0 / probs.len() as f64; probs.len()]
                }
            }
        }
    }
}

impl Classifier for LinearClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError> {
        let x = features.view();
        if x.len() != self.feature_count() {
            return Err(ClassifierError::FeatureMismatch {
                expected: self.feature_count(),
                actual: x.len(),
            });
        }

        let x = match &self.scaler {
            Some(s) => (&x - &s.mean) / &s.scale,
            None => x.to_owned(),
        };
        let scores = self.coef.dot(&x) + &self.intercept;
        let probabilities = self.probabilities(&scores);

        let best = probabilities
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bp), (i, &p)| {
                if p > bp {
                    (i, p)
                } else {
                    (bi, bp)
                }
            })
            .0;

        let label = *self.classes.get(best).ok_or_else(|| {
            ClassifierError::MalformedOutput(format!(
                "{} probabilities for {} classes",
                probabilities.len(),
                self.classes.len()
            ))
        })?;

        Ok(Prediction {
            label,
            probabilities,
        })
    }

    fn class_count(&self) -> Option<usize> {
        Some(self.classes.len())
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
