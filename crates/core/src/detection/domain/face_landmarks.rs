//! 68-point face landmarks in the iBUG 300-W layout.
//!
//! Index ranges: jaw 0..17, brows 17..27, nose 27..36, left eye 36..42,
//! right eye 42..48, mouth 48..68.

use std::ops::Range;

use crate::shared::bounding_box::BoundingBox;

pub const NUM_LANDMARKS: usize = 68;

const JAW: Range<usize> = 0..17;
const NOSE: Range<usize> = 27..36;
const LEFT_EYE: Range<usize> = 36..42;
const RIGHT_EYE: Range<usize> = 42..48;
const MOUTH: Range<usize> = 48..68;

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<(f64, f64)>,
}

impl FaceLandmarks {
    /// `None` unless exactly 68 points are given.
    pub fn new(points: Vec<(f64, f64)>) -> Option<Self> {
        (points.len() == NUM_LANDMARKS).then_some(Self { points })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn jaw_outline(&self) -> &[(f64, f64)] {
        &self.points[JAW]
    }

    pub fn nose(&self) -> &[(f64, f64)] {
        &self.points[NOSE]
    }

    pub fn left_eye(&self) -> &[(f64, f64)] {
        &self.points[LEFT_EYE]
    }

    pub fn right_eye(&self) -> &[(f64, f64)] {
        &self.points[RIGHT_EYE]
    }

    pub fn mouth(&self) -> &[(f64, f64)] {
        &self.points[MOUTH]
    }

    /// Midpoint between the two eye centroids.
    pub fn eye_center(&self) -> (f64, f64) {
        let (lx, ly) = centroid(self.left_eye());
        let (rx, ry) = centroid(self.right_eye());
        ((lx + rx) / 2.0, (ly + ry) / 2.0)
    }

    /// Tightest box around all points.
    pub fn bounding_box(&self) -> BoundingBox {
        let (mut x1, mut y1) = (f64::MAX, f64::MAX);
        let (mut x2, mut y2) = (f64::MIN, f64::MIN);
        for &(x, y) in &self.points {
            x1 = x1.min(x);
            y1 = y1.min(y);
            x2 = x2.max(x);
            y2 = y2.max(y);
        }
        BoundingBox::from_corners(x1, y1, x2, y2)
    }

    /// Maps points from a `from`-sized frame onto a `to`-sized surface.
    pub fn rescale(&self, from: (u32, u32), to: (u32, u32)) -> Self {
        if from.0 == 0 || from.1 == 0 {
            return self.clone();
        }
        let sx = to.0 as f64 / from.0 as f64;
        let sy = to.1 as f64 / from.1 as f64;
        Self {
            points: self.points.iter().map(|&(x, y)| (x * sx, y * sy)).collect(),
        }
    }
}

fn centroid(points: &[(f64, f64)]) -> (f64, f64) {
    let n = points.len().max(1) as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
    (sx / n, sy / n)
}
