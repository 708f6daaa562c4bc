use std::path::PathBuf;

use thiserror::Error;

use crate::decoding::domain::image_source::ImageSource;
use crate::shared::frame::Frame;

/// Reasons an image reference could not be turned into pixels.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to read image file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed base64 payload: {0}")]
    Base64(String),
    #[error("unrecognized image data: {0}")]
    Image(String),
}

/// Turns an [`ImageSource`] into a three-channel B,G,R [`Frame`].
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, source: &ImageSource) -> Result<Frame, DecodeError>;
}
