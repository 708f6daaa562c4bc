use std::path::{Path, PathBuf};

use thiserror::Error;

/// Rejections that happen before any decoding is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("No image data provided")]
    MissingImage,
    #[error("Image data must be a base64 string")]
    NotAString,
}

/// Where the image for one classification request comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    /// Base64 payload, optionally carrying a `data:image/...;base64,` header.
    Base64(String),
    /// Image file on local disk.
    File(PathBuf),
}

impl ImageSource {
    /// Picks the request's image reference.
    ///
    /// A file path wins over a base64 payload when both are present; blank
    /// values count as absent.
    pub fn from_parts(
        base64: Option<&str>,
        path: Option<&Path>,
    ) -> Result<ImageSource, InputError> {
        if let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) {
            return Ok(ImageSource::File(path.to_path_buf()));
        }
        match base64.map(str::trim) {
            Some(data) if !data.is_empty() => Ok(ImageSource::Base64(data.to_string())),
            _ => Err(InputError::MissingImage),
        }
    }

    /// Builds a base64 source from raw form-field bytes.
    ///
    /// The payload must be text; anything that is not UTF-8 is rejected.
    pub fn from_base64_bytes(bytes: &[u8]) -> Result<ImageSource, InputError> {
        let text = std::str::from_utf8(bytes).map_err(|_| InputError::NotAString)?;
        Self::from_parts(Some(text), None)
    }

    /// Short human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Base64(data) => format!("base64 payload ({} chars)", data.len()),
            ImageSource::File(path) => format!("file {}", path.display()),
        }
    }
}
