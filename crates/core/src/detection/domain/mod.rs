pub mod face_locator;
pub mod object_detector;
pub mod rectangle_grouper;
