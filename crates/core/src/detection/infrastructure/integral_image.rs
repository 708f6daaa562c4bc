use crate::shared::frame::Frame;

/// Summed-area tables of a single-channel frame and of its squares, plus
/// an optional 45° rotated table for tilted Haar features.
///
/// All tables carry a leading zero row and column, so the sum over
/// `[x, x+w) × [y, y+h)` needs no bounds special-casing.
pub struct IntegralImage {
    stride: usize,
    sum: Vec<i64>,
    sq_sum: Vec<i64>,
    tilted: Vec<i64>,
}

impl IntegralImage {
    pub fn new(gray: &Frame) -> Self {
        debug_assert_eq!(gray.channels(), 1, "integral image expects grayscale");
        let w = gray.width() as usize;
        let h = gray.height() as usize;
        let stride = w + 1;
        let mut sum = vec![0i64; stride * (h + 1)];
        let mut sq_sum = vec![0i64; stride * (h + 1)];
        let data = gray.data();

        for y in 0..h {
            let mut row = 0i64;
            let mut row_sq = 0i64;
            for x in 0..w {
                let v = data[y * w + x] as i64;
                row += v;
                row_sq += v * v;
                let at = (y + 1) * stride + x + 1;
                sum[at] = sum[at - stride] + row;
                sq_sum[at] = sq_sum[at - stride] + row_sq;
            }
        }

        Self {
            stride,
            sum,
            sq_sum,
            tilted: Vec::new(),
        }
    }

    /// Like [`IntegralImage::new`], also building the rotated table that
    /// [`IntegralImage::tilted_sum`] reads.
    pub fn with_tilted(gray: &Frame) -> Self {
        let mut integral = Self::new(gray);
        integral.tilted = tilted_table(gray.data(), gray.width() as usize, gray.height() as usize);
        integral
    }

    pub fn rect_sum(&self, x: usize, y: usize, w: usize, h: usize) -> i64 {
        Self::lookup(&self.sum, self.stride, x, y, w, h)
    }

    pub fn rect_sq_sum(&self, x: usize, y: usize, w: usize, h: usize) -> i64 {
        Self::lookup(&self.sq_sum, self.stride, x, y, w, h)
    }

    /// Sum over the 45° rectangle whose top corner is pixel `(x - 1, y)`,
    /// running `w` steps down-right and `h` steps down-left. Covers `2·w·h`
    /// pixels; needs `x >= h`, `x + w <= width` and `y + w + h <= height`.
    pub fn tilted_sum(&self, x: usize, y: usize, w: usize, h: usize) -> i64 {
        debug_assert!(!self.tilted.is_empty(), "built without the tilted table");
        let at = |px: usize, py: usize| self.tilted[py * self.stride + px];
        at(x, y) - at(x - h, y + h) - at(x + w, y + w) + at(x + w - h, y + w + h)
    }

    fn lookup(table: &[i64], stride: usize, x: usize, y: usize, w: usize, h: usize) -> i64 {
        let top = y * stride;
        let bottom = (y + h) * stride;
        table[bottom + x + w] - table[bottom + x] - table[top + x + w] + table[top + x]
    }
}

/// Rotated summed-area table. Cell `(X, Y)` holds the sum of every pixel
/// `(x, y)` with `y < Y` and `|x - (X - 1)| <= Y - 1 - y`, the upward
/// triangle whose apex is pixel `(X - 1, Y - 1)`.
fn tilted_table(data: &[u8], w: usize, h: usize) -> Vec<i64> {
    let stride = w + 1;
    let mut table = vec![0i64; stride * (h + 1)];
    if w == 0 || h == 0 {
        return table;
    }

    // Running diagonal sums carried from the row above.
    let mut diag = vec![0i64; w + 1];
    for (x, &v) in data[..w].iter().enumerate() {
        diag[x] = v as i64;
        table[stride + 1 + x] = v as i64;
    }

    for y in 1..h {
        let row = &data[y * w..(y + 1) * w];
        let at = (y + 1) * stride + 1;
        let mut t0 = row[0] as i64;
        table[at - 1] = table[at - stride];
        table[at] = table[at - stride] + t0 + diag[1];

        let mut x = 1;
        while x + 1 < w {
            let mut t1 = diag[x];
            diag[x - 1] = t1 + t0;
            t0 = row[x] as i64;
            t1 += diag[x + 1] + t0 + table[at + x - stride - 1];
            table[at + x] = t1;
            x += 1;
        }
        if w > 1 {
            let t1 = diag[x];
            diag[x - 1] = t1 + t0;
            t0 = row[x] as i64;
            table[at + x] = t0 + t1 + table[at + x - stride - 1];
            diag[x] = t0;
        }
    }
    table
}
