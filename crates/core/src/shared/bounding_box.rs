/// A face rectangle in frame pixel space.
///
/// Coordinates are fractional because detector output is; conversion to
/// whole pixels happens only when cropping or drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A whole-pixel rectangle guaranteed to lie inside its frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Maps a box detected on a `from`-sized frame onto a `to`-sized surface.
    pub fn rescale(&self, from: (u32, u32), to: (u32, u32)) -> Self {
        if from.0 == 0 || from.1 == 0 {
            return *self;
        }
        let sx = to.0 as f64 / from.0 as f64;
        let sy = to.1 as f64 / from.1 as f64;
        Self::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
    }

    /// Intersection with the `[0, width] x [0, height]` frame.
    pub fn clip_to(&self, width: u32, height: u32) -> Self {
        let x1 = self.x.clamp(0.0, width as f64);
        let y1 = self.y.clamp(0.0, height as f64);
        let x2 = self.right().clamp(0.0, width as f64);
        let y2 = self.bottom().clamp(0.0, height as f64);
        Self::from_corners(x1, y1, x2.max(x1), y2.max(y1))
    }

    /// Rounds to whole pixels and clamps inside a `width x height` frame.
    ///
    /// Returns `None` when nothing of the box remains inside the frame.
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> Option<PixelRect> {
        let x1 = round_clamp(self.x, width);
        let y1 = round_clamp(self.y, height);
        let x2 = round_clamp(self.right(), width);
        let y2 = round_clamp(self.bottom(), height);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(PixelRect {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        })
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

fn round_clamp(value: f64, max: u32) -> u32 {
    value.round().clamp(0.0, max as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    // ── IoU ──────────────────────────────────────────────────────────

    #[test]
    fn test_iou_identical_boxes() {
        let a = BoundingBox::new(10.0, 10.0, 100.0, 100.0);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // intersection 50*100 = 5000, union 15000
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BoundingBox::new(50.0, 0.0, 100.0, 100.0);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        let b = BoundingBox::new(50.0, 0.0, 50.0, 50.0);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    // ── Rescale ──────────────────────────────────────────────────────

    #[test]
    fn test_rescale_same_size_is_identity() {
        let b = BoundingBox::new(12.5, 7.0, 40.0, 30.0);
        assert_eq!(b.rescale((640, 480), (640, 480)), b);
    }

    #[test]
    fn test_rescale_halves_display() {
        let b = BoundingBox::new(100.0, 50.0, 200.0, 100.0);
        let r = b.rescale((640, 480), (320, 240));
        assert_relative_eq!(r.x, 50.0);
        assert_relative_eq!(r.y, 25.0);
        assert_relative_eq!(r.width, 100.0);
        assert_relative_eq!(r.height, 50.0);
    }

    #[test]
    fn test_rescale_from_zero_size_is_noop() {
        let b = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(b.rescale((0, 0), (100, 100)), b);
    }

    // ── Clipping and pixel rects ─────────────────────────────────────

    #[test]
    fn test_clip_to_frame() {
        let b = BoundingBox::new(-10.0, 90.0, 50.0, 50.0);
        let c = b.clip_to(100, 100);
        assert_relative_eq!(c.x, 0.0);
        assert_relative_eq!(c.y, 90.0);
        assert_relative_eq!(c.width, 40.0);
        assert_relative_eq!(c.height, 10.0);
    }

    #[rstest]
    #[case(BoundingBox::new(10.0, 10.0, 50.0, 60.0), Some((10, 10, 50, 60)))]
    #[case(BoundingBox::new(10.4, 9.6, 49.8, 60.2), Some((10, 10, 50, 60)))]
    #[case(BoundingBox::new(-20.0, -5.0, 50.0, 40.0), Some((0, 0, 30, 35)))]
    #[case(BoundingBox::new(180.0, 100.0, 50.0, 100.0), Some((180, 100, 20, 50)))]
    #[case(BoundingBox::new(250.0, 10.0, 20.0, 20.0), None)]
    #[case(BoundingBox::new(10.0, 10.0, 0.2, 30.0), None)]
    fn test_to_pixel_rect_on_200x150(
        #[case] b: BoundingBox,
        #[case] expected: Option<(u32, u32, u32, u32)>,
    ) {
        let rect = b
            .to_pixel_rect(200, 150)
            .map(|r| (r.x, r.y, r.width, r.height));
        assert_eq!(rect, expected);
    }

    #[test]
    fn test_empty_and_area() {
        assert!(BoundingBox::default().is_empty());
        let b = BoundingBox::from_corners(0.0, 0.0, 4.0, 5.0);
        assert!(!b.is_empty());
        assert_relative_eq!(b.area(), 20.0);
    }
}
