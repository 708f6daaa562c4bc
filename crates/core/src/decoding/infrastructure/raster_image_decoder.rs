use std::fs;
use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder as _, ImageReader};

use crate::decoding::domain::image_decoder::{DecodeError, ImageDecoder};
use crate::decoding::domain::image_source::ImageSource;
use crate::shared::frame::Frame;

/// Decodes files and base64 payloads with the `image` crate.
///
/// EXIF orientation is applied, any alpha channel is dropped and pixels are
/// reordered to B,G,R.
#[derive(Clone, Copy, Debug, Default)]
pub struct RasterImageDecoder;

impl RasterImageDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decodes an in-memory encoded image (PNG, JPEG, ...).
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<Frame, DecodeError> {
        let image_error = |e: image::ImageError| DecodeError::Image(e.to_string());
        let mut decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DecodeError::Image(e.to_string()))?
            .into_decoder()
            .map_err(image_error)?;
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let mut image = DynamicImage::from_decoder(decoder).map_err(image_error)?;
        image.apply_orientation(orientation);
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Frame::new(rgb_to_bgr(rgb.into_raw()), width, height, 3))
    }
}

impl ImageDecoder for RasterImageDecoder {
    fn decode(&self, source: &ImageSource) -> Result<Frame, DecodeError> {
        match source {
            ImageSource::File(path) => {
                let bytes = fs::read(path).map_err(|e| DecodeError::Read {
                    path: path.clone(),
                    source: e,
                })?;
                self.decode_bytes(&bytes)
            }
            ImageSource::Base64(payload) => self.decode_bytes(&decode_base64(payload)?),
        }
    }
}

/// Strips an optional data-URI header and decodes the base64 body.
///
/// ASCII whitespace (line wrapping in pasted payloads) is ignored.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let body = payload
        .split_once(',')
        .map_or(payload, |(_header, body)| body);
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))
}

fn rgb_to_bgr(mut pixels: Vec<u8>) -> Vec<u8> {
    for px in pixels.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    pixels
}
