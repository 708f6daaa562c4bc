use ndarray::ArrayView3;

use crate::shared::region::Region;

/// A decoded image: contiguous pixel bytes in row-major order.
///
/// Color frames hold three channels in B,G,R order; grayscale frames hold a
/// single channel. Channel-order conversion happens at the decoder boundary
/// only, so everything downstream can index pixels the way the trained
/// artifacts expect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels under `region`, clipped to the frame bounds.
    ///
    /// Returns `None` when the clipped region is empty.
    pub fn crop(&self, region: &Region) -> Option<Frame> {
        let clipped = region.clamp_to(self.width, self.height)?;
        let c = self.channels as usize;
        let row_len = clipped.width as usize * c;
        let stride = self.width as usize * c;

        let mut data = Vec::with_capacity(row_len * clipped.height as usize);
        for row in clipped.y as usize..(clipped.y + clipped.height) as usize {
            let start = row * stride + clipped.x as usize * c;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Some(Frame::new(
            data,
            clipped.width as u32,
            clipped.height as u32,
            self.channels,
        ))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
