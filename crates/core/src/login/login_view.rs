use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

use super::capture::{capture_frame, CaptureError, CapturedImage};
use super::overlay::{render_overlay, OverlayContainer, OverlayStyle};
use super::view_state::{PollPhase, ViewState};

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Source had no frame yet, or the view is unmounted.
    Skipped,
    Face,
    NoFace,
}

/// The login screen: credentials, the face detection result, the overlay
/// surface and the captured still.
#[derive(Debug, Default)]
pub struct LoginView {
    state: ViewState,
    phase: PollPhase,
    overlay: OverlayContainer,
    style: OverlayStyle,
    /// Surface the overlay is drawn for; the video size when unset.
    display_size: Option<(u32, u32)>,
}

impl LoginView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(style: OverlayStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn is_polling(&self) -> bool {
        self.phase == PollPhase::Polling
    }

    pub fn overlay(&self) -> &OverlayContainer {
        &self.overlay
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    pub fn set_show_landmarks(&mut self, show: bool) {
        self.style.show_landmarks = show;
    }

    pub fn set_display_size(&mut self, size: Option<(u32, u32)>) {
        self.display_size = size;
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.state.username = username.into();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.state.password = password.into();
    }

    /// Authentication is not wired up; the button only reports the attempt.
    pub fn login(&self) {
        log::debug!("Login requested for '{}'", self.state.username);
    }

    /// Marks the view as driven by a polling session. Returns `false` once
    /// the view has been unmounted.
    pub fn attach(&mut self) -> bool {
        match self.phase {
            PollPhase::Unmounted => false,
            _ => {
                self.phase = PollPhase::Polling;
                true
            }
        }
    }

    /// Terminal: later ticks and detection results are ignored.
    pub fn unmount(&mut self) {
        if self.phase != PollPhase::Unmounted {
            log::debug!("Login view unmounted");
        }
        self.phase = PollPhase::Unmounted;
        self.overlay.clear();
    }

    /// Samples `source` once and runs `detector` on the frame.
    ///
    /// Skipped without touching state when the source has no dimensions yet.
    pub fn tick(
        &mut self,
        source: &dyn FrameSource,
        detector: &mut dyn FaceDetector,
    ) -> Result<TickOutcome, DetectionError> {
        if self.phase == PollPhase::Unmounted {
            return Ok(TickOutcome::Skipped);
        }
        let Some(frame) = source.dimensions().and_then(|_| source.snapshot()) else {
            log::trace!("Tick skipped: no frame yet");
            return Ok(TickOutcome::Skipped);
        };
        let detection = detector.detect_single(&frame)?;
        let found = detection.is_some();
        if !self.apply_detection(frame.dimensions(), detection) {
            return Ok(TickOutcome::Skipped);
        }
        Ok(if found {
            TickOutcome::Face
        } else {
            TickOutcome::NoFace
        })
    }

    /// Records one detection result for a `dimensions`-sized frame and
    /// remounts the overlay. Returns `false` if the view is unmounted.
    pub fn apply_detection(&mut self, dimensions: (u32, u32), detection: Option<Detection>) -> bool {
        if self.phase == PollPhase::Unmounted {
            return false;
        }
        self.state.video_dimensions = dimensions.into();

        let was_detected = self.state.is_face_detected;
        match detection {
            Some(ref det) => {
                self.state.is_face_detected = true;
                self.state.face_location = det.bbox;
                self.state.last_score = Some(det.score);
            }
            None => {
                self.state.is_face_detected = false;
                self.state.last_score = None;
            }
        }
        if was_detected != self.state.is_face_detected {
            if self.state.is_face_detected {
                log::info!("Face detected");
            } else {
                log::info!("Face lost");
            }
        }

        let display = self.display_size.unwrap_or(dimensions);
        let canvas = render_overlay(display, dimensions, detection.as_ref(), &self.style);
        self.overlay.mount(canvas);
        true
    }

    /// Stores a PNG of `frame`, cropped to the face when one is detected.
    pub fn capture(&mut self, frame: Option<&Frame>) -> Result<&CapturedImage, CaptureError> {
        let frame = frame.ok_or(CaptureError::NoFrame)?;
        let region = self
            .state
            .is_face_detected
            .then_some(&self.state.face_location);
        let captured = capture_frame(frame, region)?;
        log::info!(
            "Captured {}x{} image",
            captured.width(),
            captured.height()
        );
        Ok(&*self.state.captured_image.insert(captured))
    }

    /// [`capture`](Self::capture) on the current frame of `source`.
    pub fn capture_from(
        &mut self,
        source: &dyn FrameSource,
    ) -> Result<&CapturedImage, CaptureError> {
        let frame = source.snapshot();
        self.capture(frame.as_ref())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;
    use image::{Rgb, RgbImage};
    use std::sync::{Mutex, PoisonError};

    /// Source whose frame can be swapped in later, like a camera warming up.
    #[derive(Default)]
    pub(crate) struct StubSource {
        frame: Mutex<Option<Frame>>,
    }

    impl StubSource {
        pub(crate) fn with_frame(w: u32, h: u32) -> Self {
            let source = Self::default();
            source.set(w, h);
            source
        }

        pub(crate) fn set(&self, w: u32, h: u32) {
            let img = RgbImage::from_pixel(w, h, Rgb([90, 90, 90]));
            *self.frame.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(Frame::from_rgb_image(img, 0));
        }
    }

    impl FrameSource for StubSource {
        fn dimensions(&self) -> Option<(u32, u32)> {
            self.snapshot().map(|f| f.dimensions())
        }

        fn snapshot(&self) -> Option<Frame> {
            self.frame
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    /// Replays a script of results, then keeps returning the last one.
    pub(crate) struct ScriptedDetector {
        script: Vec<Option<Detection>>,
        pub(crate) calls: usize,
    }

    impl ScriptedDetector {
        pub(crate) fn new(script: Vec<Option<Detection>>) -> Self {
            Self { script, calls: 0 }
        }
    }

    impl FaceDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
            let i = self.calls.min(self.script.len().saturating_sub(1));
            self.calls += 1;
            Ok(self.script.get(i).cloned().flatten().into_iter().collect())
        }
    }

    pub(crate) fn face(x: f64, y: f64, w: f64, h: f64) -> Option<Detection> {
        Some(Detection::new(BoundingBox::new(x, y, w, h), 0.8))
    }

    #[test]
    fn test_tick_without_dimensions_does_nothing() {
        let mut view = LoginView::new();
        let source = StubSource::default();
        let mut detector = ScriptedDetector::new(vec![face(1.0, 1.0, 5.0, 5.0)]);

        let outcome = view.tick(&source, &mut detector).unwrap();

        assert_eq!(outcome, TickOutcome::Skipped);
        assert_eq!(detector.calls, 0);
        assert_eq!(view.state(), &ViewState::default());
        assert!(view.overlay().canvas().is_none());
    }

    #[test]
    fn test_tick_with_face_sets_location() {
        let mut view = LoginView::new();
        let source = StubSource::with_frame(200, 150);
        let mut detector = ScriptedDetector::new(vec![face(10.0, 10.0, 50.0, 60.0)]);

        let outcome = view.tick(&source, &mut detector).unwrap();

        assert_eq!(outcome, TickOutcome::Face);
        let state = view.state();
        assert!(state.is_face_detected);
        assert_eq!(state.face_location, BoundingBox::new(10.0, 10.0, 50.0, 60.0));
        assert_eq!(state.video_dimensions.as_tuple(), (200, 150));
        assert_eq!(state.last_score, Some(0.8));
        let canvas = view.overlay().canvas().unwrap();
        assert_eq!(canvas.dimensions(), (200, 150));
    }

    #[test]
    fn test_face_lost_clears_flag_but_keeps_location() {
        let mut view = LoginView::new();
        let source = StubSource::with_frame(200, 150);
        let mut detector = ScriptedDetector::new(vec![face(10.0, 10.0, 50.0, 60.0), None]);

        view.tick(&source, &mut detector).unwrap();
        let outcome = view.tick(&source, &mut detector).unwrap();

        assert_eq!(outcome, TickOutcome::NoFace);
        assert!(!view.state().is_face_detected);
        assert_eq!(
            view.state().face_location,
            BoundingBox::new(10.0, 10.0, 50.0, 60.0)
        );
        assert_eq!(view.overlay().generation(), 2);
    }

    #[test]
    fn test_capture_crops_to_detected_face() {
        let mut view = LoginView::new();
        let source = StubSource::with_frame(200, 150);
        let mut detector = ScriptedDetector::new(vec![face(10.0, 10.0, 50.0, 60.0)]);
        view.tick(&source, &mut detector).unwrap();

        let captured = view.capture_from(&source).unwrap();

        assert_eq!(captured.dimensions(), (50, 60));
        assert!(view.state().captured_image.is_some());
    }

    #[test]
    fn test_capture_without_face_keeps_full_frame() {
        let mut view = LoginView::new();
        let source = StubSource::with_frame(200, 150);
        let mut detector = ScriptedDetector::new(vec![face(10.0, 10.0, 50.0, 60.0), None]);
        view.tick(&source, &mut detector).unwrap();
        view.tick(&source, &mut detector).unwrap();

        let captured = view.capture_from(&source).unwrap();

        assert_eq!(captured.dimensions(), (200, 150));
    }

    #[test]
    fn test_capture_without_frame_fails() {
        let mut view = LoginView::new();
        let result = view.capture_from(&StubSource::default());
        assert!(matches!(result, Err(CaptureError::NoFrame)));
        assert!(view.state().captured_image.is_none());
    }

    #[test]
    fn test_credentials_are_stored() {
        let mut view = LoginView::new();
        view.set_username("ada");
        view.set_password("hunter2");
        view.login();

        assert_eq!(view.state().username, "ada");
        assert_eq!(view.state().password, "hunter2");
    }

    #[test]
    fn test_unmount_is_terminal() {
        let mut view = LoginView::new();
        assert!(view.attach());
        assert!(view.is_polling());
        let source = StubSource::with_frame(200, 150);
        let mut detector = ScriptedDetector::new(vec![face(10.0, 10.0, 50.0, 60.0)]);
        view.tick(&source, &mut detector).unwrap();

        view.unmount();

        assert_eq!(view.phase(), PollPhase::Unmounted);
        assert!(view.overlay().canvas().is_none());
        assert!(!view.attach());
        assert!(!view.apply_detection((200, 150), None));
        assert!(view.state().is_face_detected);
        assert_eq!(
            view.tick(&source, &mut detector).unwrap(),
            TickOutcome::Skipped
        );
        assert_eq!(detector.calls, 1);
    }

    #[test]
    fn test_overlay_uses_display_size() {
        let mut view = LoginView::new();
        view.set_display_size(Some((400, 300)));

        view.apply_detection((200, 150), face(10.0, 10.0, 50.0, 60.0));

        let canvas = view.overlay().canvas().unwrap();
        assert_eq!(canvas.dimensions(), (400, 300));
    }
}
