use crate::shared::frame::Frame;

/// Fixed-point BT.601 luma weights, scaled by 2^14.
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;

/// Which channel of a three-channel buffer the red weight applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Buffer is B,G,R: red weight applies to the last channel.
    Bgr,
    /// Buffer is treated as R,G,B: red weight applies to the first channel.
    ///
    /// The wavelet channel of the trained feature layout was produced this
    /// way from a B,G,R buffer, so the extractor relies on it.
    Rgb,
}

/// Converts a three-channel frame to single-channel luma.
///
/// Single-channel input is returned unchanged.
pub fn to_gray(frame: &Frame, order: ChannelOrder) -> Frame {
    if frame.channels() == 1 {
        return frame.clone();
    }

    let (w0, w2) = match order {
        ChannelOrder::Bgr => (B_WEIGHT, R_WEIGHT),
        ChannelOrder::Rgb => (R_WEIGHT, B_WEIGHT),
    };
    let c = frame.channels() as usize;
    let gray = frame
        .data()
        .chunks_exact(c)
        .map(|px| {
            let v = px[0] as u32 * w0 + px[1] as u32 * G_WEIGHT + px[2] as u32 * w2;
            ((v + (1 << (SHIFT - 1))) >> SHIFT) as u8
        })
        .collect();
    Frame::new(gray, frame.width(), frame.height(), 1)
}
