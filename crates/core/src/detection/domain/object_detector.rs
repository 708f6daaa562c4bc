use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for finding objects in a grayscale frame.
///
/// Detection is stateless, so one detector can serve concurrent requests.
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, gray: &Frame) -> Vec<Region>;
}
