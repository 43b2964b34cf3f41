use thiserror::Error;

use crate::shared::frame::Frame;

use super::detection::Detection;

/// Failure of the model or its runtime. "No face" is never an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unexpected model output: {0}")]
    Output(String),
    #[error("unsupported frame: {0}")]
    Frame(String),
}

/// Domain interface for face detection.
///
/// Implementations may be stateful (e.g., holding a runtime session),
/// hence `&mut self`.
pub trait FaceDetector: Send {
    /// Every face that clears the detector's score threshold.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError>;

    /// The single most confident face, or `None` when no face qualifies.
    fn detect_single(&mut self, frame: &Frame) -> Result<Option<Detection>, DetectionError> {
        Ok(Detection::best(self.detect(frame)?))
    }
}
