use log::debug;

use crate::detection::domain::object_detector::ObjectDetector;
use crate::imaging::color::{to_gray, ChannelOrder};
use crate::shared::constants::MIN_EYES;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// A qualifying face: where it was found and its color pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceCrop {
    pub region: Region,
    pub image: Frame,
}

/// Finds the faces in a frame that are worth classifying.
pub trait FaceLocator: Send + Sync {
    /// Returns crops in detection order; empty when nothing qualifies.
    fn locate(&self, frame: &Frame) -> Vec<FaceCrop>;
}

/// Keeps only faces in which at least `min_eyes` eyes are detected.
pub struct EyeGatedFaceLocator {
    faces: Box<dyn ObjectDetector>,
    eyes: Box<dyn ObjectDetector>,
    min_eyes: usize,
}

impl EyeGatedFaceLocator {
    pub fn new(faces: Box<dyn ObjectDetector>, eyes: Box<dyn ObjectDetector>) -> Self {
        Self {
            faces,
            eyes,
            min_eyes: MIN_EYES,
        }
    }

    pub fn with_min_eyes(mut self, min_eyes: usize) -> Self {
        self.min_eyes = min_eyes;
        self
    }
}

impl FaceLocator for EyeGatedFaceLocator {
    fn locate(&self, frame: &Frame) -> Vec<FaceCrop> {
        let gray = to_gray(frame, ChannelOrder::Bgr);
        let faces = self.faces.detect(&gray);

        let mut crops = Vec::new();
        for region in faces {
            let (Some(gray_roi), Some(color_roi)) = (gray.crop(&region), frame.crop(&region))
            else {
                continue;
            };
            let eyes = self.eyes.detect(&gray_roi).len();
            if eyes >= self.min_eyes {
                crops.push(FaceCrop {
                    region,
                    image: color_roi,
                });
            } else {
                debug!(
                    "Skipping face at ({}, {}) {}x{}: {} eye(s) found",
                    region.x, region.y, region.width, region.height, eyes
                );
            }
        }
        crops
    }
}

/// Locator used when no cascades are available; never finds a face.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledFaceLocator;

impl FaceLocator for DisabledFaceLocator {
    fn locate(&self, _frame: &Frame) -> Vec<FaceCrop> {
        Vec::new()
    }
}
