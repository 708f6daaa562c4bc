use std::path::Path;

use log::{info, warn};

use crate::detection::domain::face_locator::{DisabledFaceLocator, EyeGatedFaceLocator, FaceLocator};
use crate::detection::infrastructure::haar_cascade::{CascadeDetector, CascadeError, HaarCascade};
use crate::shared::constants::{
    EYE_CASCADE_NAME, EYE_MIN_NEIGHBORS, EYE_SCALE_FACTOR, FACE_CASCADE_NAME,
    FACE_MIN_NEIGHBORS, FACE_SCALE_FACTOR,
};

/// Builds the eye-gated face locator from the cascades in `dir`.
pub fn load_face_locator(dir: &Path) -> Result<EyeGatedFaceLocator, CascadeError> {
    let face = HaarCascade::from_file(&dir.join(FACE_CASCADE_NAME))?;
    let eye = HaarCascade::from_file(&dir.join(EYE_CASCADE_NAME))?;
    Ok(EyeGatedFaceLocator::new(
        Box::new(CascadeDetector::new(face, FACE_SCALE_FACTOR, FACE_MIN_NEIGHBORS)),
        Box::new(CascadeDetector::new(eye, EYE_SCALE_FACTOR, EYE_MIN_NEIGHBORS)),
    ))
}

/// Like [`load_face_locator`], but degrades to a locator that never finds a
/// face when the cascades cannot be loaded. The failure is logged once here.
pub fn load_face_locator_or_disabled(dir: &Path) -> Box<dyn FaceLocator> {
    match load_face_locator(dir) {
        Ok(locator) => {
            info!("Face detection cascades loaded from {}", dir.display());
            Box::new(locator)
        }
        Err(e) => {
            warn!(
                "Face detection disabled, cascades unavailable in {}: {e}",
                dir.display()
            );
            Box::new(DisabledFaceLocator)
        }
    }
}
