use crate::shared::bounding_box::BoundingBox;

use super::capture::CapturedImage;

/// Pixel size of the video feed as last seen by a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

impl VideoDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_tuple(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl From<(u32, u32)> for VideoDimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// Everything the login screen renders.
///
/// `face_location` keeps the last detected box after the face leaves the
/// frame; only `is_face_detected` tells whether it is current.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
    pub username: String,
    pub password: String,
    pub is_face_detected: bool,
    pub video_dimensions: VideoDimensions,
    pub face_location: BoundingBox,
    pub captured_image: Option<CapturedImage>,
    /// Score of the current detection, if any.
    pub last_score: Option<f64>,
}

/// Lifecycle of the periodic detection driving a view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PollPhase {
    /// No frame source attached yet.
    #[default]
    Idle,
    /// A polling session is ticking.
    Polling,
    /// Torn down; terminal.
    Unmounted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_starts_empty() {
        let state = ViewState::default();

        assert!(state.username.is_empty());
        assert!(state.password.is_empty());
        assert!(!state.is_face_detected);
        assert!(!state.video_dimensions.is_known());
        assert_eq!(state.face_location, BoundingBox::default());
        assert!(state.captured_image.is_none());
        assert!(state.last_score.is_none());
    }

    #[test]
    fn test_video_dimensions_from_tuple() {
        let dims = VideoDimensions::from((640, 480));
        assert_eq!(dims.as_tuple(), (640, 480));
        assert!(dims.is_known());
    }
}
