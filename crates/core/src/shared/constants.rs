/// Side length both feature components are resized to.
pub const FEATURE_SIDE: u32 = 32;

/// Raw (B,G,R) component length of a feature vector.
pub const RAW_FEATURE_LEN: usize = (FEATURE_SIDE * FEATURE_SIDE * 3) as usize;

/// Wavelet component length of a feature vector.
pub const WAVELET_FEATURE_LEN: usize = (FEATURE_SIDE * FEATURE_SIDE) as usize;

/// Total feature vector length the trained classifier consumes.
pub const FEATURE_LEN: usize = RAW_FEATURE_LEN + WAVELET_FEATURE_LEN;

/// Decomposition depth of the Haar wavelet channel.
pub const WAVELET_LEVEL: usize = 5;

/// Face cascade scan parameters the classifier was trained against.
pub const FACE_SCALE_FACTOR: f64 = 1.3;
pub const FACE_MIN_NEIGHBORS: usize = 5;

/// Eye cascade scan parameters (the cascade scanner's defaults).
pub const EYE_SCALE_FACTOR: f64 = 1.1;
pub const EYE_MIN_NEIGHBORS: usize = 3;

/// A face crop qualifies only with at least this many detected eyes.
pub const MIN_EYES: usize = 2;

pub const FACE_CASCADE_NAME: &str = "haarcascade_frontalface_default.xml";
pub const EYE_CASCADE_NAME: &str = "haarcascade_eye.xml";

pub const CLASS_DICTIONARY_NAME: &str = "class_dictionary.json";
pub const DEFAULT_MODEL_NAME: &str = "saved_model.onnx";

pub const DEFAULT_ARTIFACTS_DIR: &str = "./artifacts";
pub const DEFAULT_CASCADES_DIR: &str = "./opencv/haarcascades";

/// Label reported when the model predicts an index missing from the
/// class dictionary.
pub const UNKNOWN_CLASS: &str = "Unknown";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
