//! Face/eye-gated image classification.
//!
//! Decodes an image, finds faces that show at least two eyes, turns each
//! face into a fixed-length pixel + wavelet feature vector and scores it
//! with a pre-trained classifier.

pub mod classification;
pub mod decoding;
pub mod detection;
pub mod features;
pub mod imaging;
pub mod pipeline;
pub mod shared;
