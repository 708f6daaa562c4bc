//! Bilinear resampling with fixed-point weights.
//!
//! Sample positions use half-pixel centres and 11-bit interpolation
//! weights, the same arithmetic the trained feature layout was produced
//! with. An exact 2× downscale on both axes is a 2×2 box average.
//!
//! [`resize_linear_exact`] is the bit-exact variant used for the cascade
//! pyramid: 8-bit weights and a single rounding per pass.

use crate::shared::frame::Frame;

const COEF_BITS: u32 = 11;
const COEF_SCALE: f32 = (1 << COEF_BITS) as f32;

const EXACT_BITS: u32 = 8;
const EXACT_ONE: u32 = 1 << EXACT_BITS;

/// Source indices and weights for one destination column or row.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Tap {
    i0: usize,
    i1: usize,
    w0: i32,
    w1: i32,
}

/// Resizes `frame` to `dst_w × dst_h`, keeping its channel count.
pub fn resize_linear(frame: &Frame, dst_w: u32, dst_h: u32) -> Frame {
    if frame.is_empty() || dst_w == 0 || dst_h == 0 {
        return Frame::new(Vec::new(), 0, 0, frame.channels());
    }
    if frame.width() == dst_w && frame.height() == dst_h {
        return frame.clone();
    }
    if frame.width() == dst_w * 2 && frame.height() == dst_h * 2 {
        return halve(frame);
    }

    let c = frame.channels() as usize;
    let src = frame.data();
    let src_stride = frame.width() as usize * c;
    let xs = taps(frame.width(), dst_w);
    let ys = taps(frame.height(), dst_h);

    let row_len = dst_w as usize * c;
    let horizontal = |row: usize| -> Vec<i32> {
        let line = &src[row * src_stride..(row + 1) * src_stride];
        let mut out = Vec::with_capacity(row_len);
        for tap in &xs {
            for ch in 0..c {
                let a = line[tap.i0 * c + ch] as i32;
                let b = line[tap.i1 * c + ch] as i32;
                out.push(a * tap.w0 + b * tap.w1);
            }
        }
        out
    };

    let mut data = Vec::with_capacity(row_len * dst_h as usize);
    let mut cached: Option<(usize, Vec<i32>)> = None;
    for ty in &ys {
        let top = match cached.take() {
            Some((row, buf)) if row == ty.i0 => buf,
            _ => horizontal(ty.i0),
        };
        let bottom = if ty.i1 == ty.i0 {
            top.clone()
        } else {
            horizontal(ty.i1)
        };
        for (a, b) in top.iter().zip(&bottom) {
            let v = (((ty.w0 * (a >> 4)) >> 16) + ((ty.w1 * (b >> 4)) >> 16) + 2) >> 2;
            data.push(v.clamp(0, 255) as u8);
        }
        cached = Some((ty.i1, bottom));
    }

    Frame::new(data, dst_w, dst_h, frame.channels())
}

/// Inverse of the destination/source ratio, computed the way the trained
/// pipeline computed it.
fn inverse_scale(src: u32, dst: u32) -> f64 {
    1.0 / (dst as f64 / src as f64)
}

fn taps(src: u32, dst: u32) -> Vec<Tap> {
    let scale = inverse_scale(src, dst);
    let last = src as i64 - 1;
    (0..dst)
        .map(|d| {
            let pos = ((d as f64 + 0.5) * scale - 0.5) as f32;
            let mut s = pos.floor() as i64;
            let mut frac = pos - s as f32;
            if s < 0 {
                s = 0;
                frac = 0.0;
            }
            if s >= last {
                s = last;
                frac = 0.0;
            }
            Tap {
                i0: s as usize,
                i1: (s + 1).min(last) as usize,
                w0: ((1.0 - frac) * COEF_SCALE).round_ties_even() as i32,
                w1: (frac * COEF_SCALE).round_ties_even() as i32,
            }
        })
        .collect()
}

fn halve(frame: &Frame) -> Frame {
    let c = frame.channels() as usize;
    let dst_w = frame.width() / 2;
    let dst_h = frame.height() / 2;
    let src = frame.as_ndarray();

    let mut data = Vec::with_capacity(dst_w as usize * dst_h as usize * c);
    for y in 0..dst_h as usize {
        for x in 0..dst_w as usize {
            for ch in 0..c {
                let sum = src[[2 * y, 2 * x, ch]] as u32
                    + src[[2 * y, 2 * x + 1, ch]] as u32
                    + src[[2 * y + 1, 2 * x, ch]] as u32
                    + src[[2 * y + 1, 2 * x + 1, ch]] as u32;
                data.push(((sum + 2) >> 2) as u8);
            }
        }
    }
    Frame::new(data, dst_w, dst_h, frame.channels())
}

/// Destination column or row of the bit-exact resize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExactTap {
    /// Left of the first source sample; copies it.
    First,
    Between { i: usize, w0: u32, w1: u32 },
    /// At or right of the last source sample; copies it.
    Last,
}

fn exact_taps(src: u32, dst: u32) -> Vec<ExactTap> {
    let scale = inverse_scale(src, dst);
    let last = src as i64 - 1;
    (0..dst)
        .map(|d| {
            let pos = scale * (d as f64 + 0.5) - 0.5;
            let s = pos.floor() as i64;
            if s < 0 || src <= 1 {
                ExactTap::First
            } else if s < last {
                let w1 = ((pos - s as f64) * EXACT_ONE as f64).round_ties_even() as u32;
                ExactTap::Between {
                    i: s as usize,
                    w0: EXACT_ONE - w1,
                    w1,
                }
            } else {
                ExactTap::Last
            }
        })
        .collect()
}

/// Bit-exact bilinear resize.
///
/// Horizontal sums keep 8 fractional bits. Rows between two source rows are
/// blended and rounded once at 16 bits; rows past either edge round the
/// horizontal sum directly.
pub fn resize_linear_exact(frame: &Frame, dst_w: u32, dst_h: u32) -> Frame {
    if frame.is_empty() || dst_w == 0 || dst_h == 0 {
        return Frame::new(Vec::new(), 0, 0, frame.channels());
    }
    if frame.width() == dst_w && frame.height() == dst_h {
        return frame.clone();
    }

    let c = frame.channels() as usize;
    let src = frame.data();
    let src_stride = frame.width() as usize * c;
    let xs = exact_taps(frame.width(), dst_w);
    let ys = exact_taps(frame.height(), dst_h);
    let last_row = frame.height() as usize - 1;

    let row_len = dst_w as usize * c;
    let horizontal = |row: usize| -> Vec<u32> {
        let line = &src[row * src_stride..(row + 1) * src_stride];
        let last_px = line.len() - c;
        let mut out = Vec::with_capacity(row_len);
        for tap in &xs {
            for ch in 0..c {
                out.push(match *tap {
                    ExactTap::First => (line[ch] as u32) << EXACT_BITS,
                    ExactTap::Last => (line[last_px + ch] as u32) << EXACT_BITS,
                    ExactTap::Between { i, w0, w1 } => {
                        w0 * line[i * c + ch] as u32 + w1 * line[(i + 1) * c + ch] as u32
                    }
                });
            }
        }
        out
    };
    let round_edge = |h: &u32| ((h + (EXACT_ONE >> 1)) >> EXACT_BITS).min(255) as u8;

    let mut data = Vec::with_capacity(row_len * dst_h as usize);
    for ty in &ys {
        match *ty {
            ExactTap::First => data.extend(horizontal(0).iter().map(round_edge)),
            ExactTap::Last => data.extend(horizontal(last_row).iter().map(round_edge)),
            ExactTap::Between { i, w0, w1 } => {
                let top = horizontal(i);
                let bottom = horizontal(i + 1);
                data.extend(top.iter().zip(&bottom).map(|(a, b)| {
                    ((a * w0 + b * w1 + (1 << 15)) >> (2 * EXACT_BITS)).min(255) as u8
                }));
            }
        }
    }

    Frame::new(data, dst_w, dst_h, frame.channels())
}
