pub mod artifact_loader;
pub mod linear_classifier;
pub mod onnx_classifier;
