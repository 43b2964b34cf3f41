use crate::shared::bounding_box::BoundingBox;

use super::face_landmarks::FaceLandmarks;

/// One detected face: its box in frame pixel space and the detector score.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Confidence in `[0, 1]`.
    pub score: f64,
    pub landmarks: Option<FaceLandmarks>,
}

impl Detection {
    pub fn new(bbox: BoundingBox, score: f64) -> Self {
        Self {
            bbox,
            score,
            landmarks: None,
        }
    }

    /// Highest-scoring detection, if any.
    pub fn best(detections: Vec<Detection>) -> Option<Detection> {
        detections.into_iter().max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}
