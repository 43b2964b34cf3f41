use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::face_detector::DetectionError;
use super::face_landmarks::FaceLandmarks;

/// Locates facial landmarks inside an already detected face box.
pub trait FaceLandmarker: Send {
    /// Landmarks in frame pixel coordinates.
    fn landmarks(
        &mut self,
        frame: &Frame,
        face: &BoundingBox,
    ) -> Result<FaceLandmarks, DetectionError>;
}
