use ndarray::{Array1, ArrayView1};
use thiserror::Error;

use crate::shared::constants::FEATURE_LEN;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("feature vector must have {FEATURE_LEN} values, got {0}")]
pub struct FeatureLengthError(pub usize);

/// Classifier input: raw B,G,R pixels followed by the wavelet image,
/// always exactly [`FEATURE_LEN`] values.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector(Array1<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Result<Self, FeatureLengthError> {
        if values.len() != FEATURE_LEN {
            return Err(FeatureLengthError(values.len()));
        }
        Ok(Self(Array1::from(values)))
    }

    /// For callers that built exactly `FEATURE_LEN` values by construction.
    pub(crate) fn from_fixed(values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), FEATURE_LEN);
        Self(Array1::from(values))
    }

    pub fn view(&self) -> ArrayView1<'_, f64> {
        self.0.view()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_f32(&self) -> Vec<f32> {
        self.0.iter().map(|&v| v as f32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_exact_length() {
        let fv = FeatureVector::new(vec![1.0; FEATURE_LEN]).unwrap();
        assert_eq!(fv.len(), FEATURE_LEN);
        assert_eq!(fv.to_f32()[0], 1.0f32);
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert_eq!(
            FeatureVector::new(vec![0.0; 10]),
            Err(FeatureLengthError(10))
        );
    }
}
