use std::fs;
use std::path::Path;

use serde_json::json;

use faceclass_core::shared::constants::{CLASS_DICTIONARY_NAME, FEATURE_LEN, RAW_FEATURE_LEN};

/// Two-class model: "azure" scores the blue channel, "crimson" the red one.
pub fn write_artifacts(dir: &Path) {
    let mut azure = vec![0.0; FEATURE_LEN];
    let mut crimson = vec![0.0; FEATURE_LEN];
    for px in 0..RAW_FEATURE_LEN / 3 {
        // B,G,R interleaving
        azure[px * 3] = 1.0 / 1024.0;
        azure[px * 3 + 2] = -1.0 / 1024.0;
        crimson[px * 3] = -1.0 / 1024.0;
        crimson[px * 3 + 2] = 1.0 / 1024.0;
    }
    let model = json!({
        "classes": [0, 1],
        "coef": [azure, crimson],
        "intercept": [0.0, 0.0],
        "multi_class": "multinomial"
    });
    fs::write(dir.join("model.json"), model.to_string()).unwrap();
    fs::write(
        dir.join(CLASS_DICTIONARY_NAME),
        r#"{"azure": 0, "crimson": 1}"#,
    )
    .unwrap();
}
