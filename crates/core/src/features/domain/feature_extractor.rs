use crate::features::domain::feature_vector::FeatureVector;
use crate::features::domain::wavelet::detail_image;
use crate::imaging::resize::resize_linear;
use crate::shared::constants::{FEATURE_LEN, FEATURE_SIDE, WAVELET_LEVEL};
use crate::shared::frame::Frame;

/// Builds the classifier input for one color face crop.
///
/// The crop is resized to 32x32 and flattened row by row with channels
/// interleaved (B,G,R). The wavelet detail image of the full-resolution
/// crop is resized to 32x32 and appended.
pub fn extract_features(crop: &Frame) -> FeatureVector {
    let raw = resize_linear(crop, FEATURE_SIDE, FEATURE_SIDE);
    let texture = resize_linear(&detail_image(crop, WAVELET_LEVEL), FEATURE_SIDE, FEATURE_SIDE);

    let mut values = Vec::with_capacity(FEATURE_LEN);
    values.extend(raw.data().iter().map(|&v| v as f64));
    values.extend(texture.data().iter().map(|&v| v as f64));

    FeatureVector::from_fixed(values)
}
