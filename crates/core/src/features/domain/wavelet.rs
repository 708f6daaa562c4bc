//! Multi-level 2D Haar (db1) wavelet decomposition and reconstruction.
//!
//! Signals of odd length are extended by repeating their last sample, so
//! each level halves a dimension rounding up. All arithmetic is `f32`.

use ndarray::{Array2, Axis};

use crate::imaging::color::{to_gray, ChannelOrder};
use crate::shared::frame::Frame;

/// Haar filter tap, 1/sqrt(2) rounded to `f32`.
const TAP: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// The three detail bands of one decomposition level.
///
/// Band names give the filter applied along rows (first letter) and columns
/// (second letter): `a` for approximation, `d` for detail.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailBands {
    pub ad: Array2<f32>,
    pub da: Array2<f32>,
    pub dd: Array2<f32>,
}

impl DetailBands {
    fn shape(&self) -> (usize, usize) {
        self.ad.dim()
    }
}

/// Single-level 2D transform: returns the approximation and detail bands.
pub fn dwt2(x: &Array2<f32>) -> (Array2<f32>, DetailBands) {
    let (a, d) = dwt_axis(x, Axis(0));
    let (aa, ad) = dwt_axis(&a, Axis(1));
    let (da, dd) = dwt_axis(&d, Axis(1));
    (aa, DetailBands { ad, da, dd })
}

/// Single-level 2D inverse transform. Output dimensions are twice the
/// band dimensions.
pub fn idwt2(aa: &Array2<f32>, details: &DetailBands) -> Array2<f32> {
    let a = idwt_axis(aa, &details.ad, Axis(1));
    let d = idwt_axis(&details.da, &details.dd, Axis(1));
    idwt_axis(&a, &d, Axis(0))
}

/// Multi-level decomposition. Details are returned coarsest level first.
pub fn wavedec2(x: &Array2<f32>, level: usize) -> (Array2<f32>, Vec<DetailBands>) {
    let mut approx = x.clone();
    let mut details = Vec::with_capacity(level);
    for _ in 0..level {
        let (a, d) = dwt2(&approx);
        approx = a;
        details.push(d);
    }
    details.reverse();
    (approx, details)
}

/// Multi-level reconstruction from coarsest-first details.
///
/// Between levels the running approximation is trimmed to the next detail
/// shape; the final output is not trimmed.
pub fn waverec2(approx: &Array2<f32>, details: &[DetailBands]) -> Array2<f32> {
    let mut a = approx.clone();
    for bands in details {
        let (rows, cols) = bands.shape();
        if a.dim() != (rows, cols) {
            a = a.slice(ndarray::s![..rows, ..cols]).to_owned();
        }
        a = idwt2(&a, bands);
    }
    a
}

/// Wavelet texture image of a color crop.
///
/// The crop is reduced to gray, scaled to `[0, 1]`, decomposed `level`
/// times, and rebuilt from the detail bands only. The result is scaled
/// back by 255 and truncated to bytes with wrap-around.
pub fn detail_image(crop: &Frame, level: usize) -> Frame {
    let gray = to_gray(crop, ChannelOrder::Rgb);
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let x = Array2::from_shape_fn((h, w), |(r, c)| gray.data()[r * w + c] as f32 / 255.0);

    let (approx, details) = wavedec2(&x, level);
    let rebuilt = waverec2(&Array2::zeros(approx.raw_dim()), &details);

    let (out_h, out_w) = rebuilt.dim();
    let data = rebuilt
        .iter()
        .map(|&v| ((v * 255.0) as i32) as u8)
        .collect();
    Frame::new(data, out_w as u32, out_h as u32, 1)
}

fn dwt_axis(x: &Array2<f32>, axis: Axis) -> (Array2<f32>, Array2<f32>) {
    let n = x.len_of(axis);
    let half = n.div_ceil(2);
    let mut dim = x.raw_dim();
    dim[axis.index()] = half;
    let mut approx = Array2::zeros(dim.clone());
    let mut detail = Array2::zeros(dim);

    for ((src, mut a), mut d) in x
        .lanes(axis)
        .into_iter()
        .zip(approx.lanes_mut(axis))
        .zip(detail.lanes_mut(axis))
    {
        for i in 0..half {
            let x0 = src[2 * i];
            let x1 = src[(2 * i + 1).min(n - 1)];
            a[i] = TAP * x1 + TAP * x0;
            d[i] = -TAP * x1 + TAP * x0;
        }
    }
    (approx, detail)
}

fn idwt_axis(a: &Array2<f32>, d: &Array2<f32>, axis: Axis) -> Array2<f32> {
    debug_assert_eq!(a.dim(), d.dim());
    let n = a.len_of(axis);
    let mut dim = a.raw_dim();
    dim[axis.index()] = 2 * n;
    let mut out = Array2::zeros(dim);

    for ((mut dst, lo), hi) in out
        .lanes_mut(axis)
        .into_iter()
        .zip(a.lanes(axis))
        .zip(d.lanes(axis))
    {
        for i in 0..n {
            dst[2 * i] = TAP * lo[i] + TAP * hi[i];
            dst[2 * i + 1] = TAP * lo[i] + -TAP * hi[i];
        }
    }
    out
}
