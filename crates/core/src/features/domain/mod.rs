pub mod feature_extractor;
pub mod feature_vector;
pub mod wavelet;
