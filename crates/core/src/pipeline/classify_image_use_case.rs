use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;

use crate::classification::domain::classification_result::ClassificationResult;
use crate::classification::domain::crop_outcome::classify_crop;
use crate::classification::infrastructure::artifact_loader::ArtifactLoader;
use crate::decoding::domain::image_decoder::{DecodeError, ImageDecoder};
use crate::decoding::domain::image_source::{ImageSource, InputError};
use crate::detection::domain::face_locator::FaceLocator;
use crate::features::domain::feature_extractor::extract_features;

/// Request-level failures that stop classification before any decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("Model not loaded")]
    ModelUnavailable,
}

/// What a classification request produced.
#[derive(Debug)]
pub enum Classification {
    /// One entry per qualifying face, in detection order. Entries may be
    /// per-crop errors.
    Faces(Vec<ClassificationResult>),
    /// The image decoded but no face with two eyes was found.
    NoQualifyingFace,
    /// The image reference could not be decoded.
    Undecodable(DecodeError),
}

impl Classification {
    /// Response entries for clients: results per face, nothing when no face
    /// qualifies, a single error entry for undecodable input.
    pub fn into_results(self) -> Vec<ClassificationResult> {
        match self {
            Classification::Faces(results) => results,
            Classification::NoQualifyingFace => Vec::new(),
            Classification::Undecodable(e) => vec![ClassificationResult::error(format!(
                "Could not decode image: {e}"
            ))],
        }
    }
}

/// Single-image classification pipeline:
/// validate → decode → locate faces → extract features → predict.
pub struct ClassifyImageUseCase {
    decoder: Box<dyn ImageDecoder>,
    locator: Box<dyn FaceLocator>,
    artifacts: Arc<ArtifactLoader>,
}

impl ClassifyImageUseCase {
    pub fn new(
        decoder: Box<dyn ImageDecoder>,
        locator: Box<dyn FaceLocator>,
        artifacts: Arc<ArtifactLoader>,
    ) -> Self {
        Self {
            decoder,
            locator,
            artifacts,
        }
    }

    pub fn artifacts(&self) -> &ArtifactLoader {
        &self.artifacts
    }

    /// Classifies the image given as a base64 payload or a file path; the
    /// path wins when both are present.
    pub fn execute(
        &self,
        base64: Option<&str>,
        path: Option<&Path>,
    ) -> Result<Classification, ClassifyError> {
        let source = ImageSource::from_parts(base64, path)?;
        self.execute_source(&source)
    }

    pub fn execute_source(&self, source: &ImageSource) -> Result<Classification, ClassifyError> {
        let artifacts = self.artifacts.get().ok_or(ClassifyError::ModelUnavailable)?;
        debug!("Classifying {}", source.describe());

        let frame = match self.decoder.decode(source) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Could not decode {}: {e}", source.describe());
                return Ok(Classification::Undecodable(e));
            }
        };

        let crops = self.locator.locate(&frame);
        if crops.is_empty() {
            info!(
                "No face with two eyes in {}x{} image",
                frame.width(),
                frame.height()
            );
            return Ok(Classification::NoQualifyingFace);
        }

        let results: Vec<ClassificationResult> = crops
            .into_iter()
            .map(|crop| {
                let features = extract_features(&crop.image);
                let outcome =
                    classify_crop(artifacts.classifier.as_ref(), &artifacts.labels, &features);
                ClassificationResult::from_outcome(crop.region, outcome, &artifacts.labels)
            })
            .collect();
        info!("Classified {} face(s)", results.len());
        Ok(Classification::Faces(results))
    }
}
