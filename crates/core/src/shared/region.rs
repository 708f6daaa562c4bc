/// An axis-aligned detection rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Intersection with a `width × height` frame, or `None` if nothing
    /// of the region lies inside it.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.right().min(width as i32);
        let y2 = self.bottom().min(height as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Region::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// Two regions are similar when every edge differs by at most
    /// `eps * (min width + min height) / 2`.
    pub fn is_similar(&self, other: &Region, eps: f64) -> bool {
        let delta = eps
            * (self.width.min(other.width) + self.height.min(other.height)) as f64
            * 0.5;
        (self.x - other.x).abs() as f64 <= delta
            && (self.y - other.y).abs() as f64 <= delta
            && (self.right() - other.right()).abs() as f64 <= delta
            && (self.bottom() - other.bottom()).abs() as f64 <= delta
    }

    /// Whether this region lies inside `outer` grown by `eps` of its size.
    pub fn is_inside(&self, outer: &Region, eps: f64) -> bool {
        let dx = (outer.width as f64 * eps).round_ties_even() as i32;
        let dy = (outer.height as f64 * eps).round_ties_even() as i32;
        self.x >= outer.x - dx
            && self.y >= outer.y - dy
            && self.right() <= outer.right() + dx
            && self.bottom() <= outer.bottom() + dy
    }
}
