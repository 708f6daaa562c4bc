pub mod class_label_map;
pub mod classification_result;
pub mod classifier;
pub mod crop_outcome;
