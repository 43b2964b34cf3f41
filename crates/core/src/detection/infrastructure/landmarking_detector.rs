use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::detection::domain::face_landmarker::FaceLandmarker;
use crate::shared::frame::Frame;

/// Attaches 68-point landmarks to the faces an inner detector finds.
///
/// A landmark failure leaves `landmarks` empty instead of failing the
/// detection; the face box is still valid without them.
///
/// Failures are warned about once per streak, not once per frame.
pub struct LandmarkingDetector<D, L> {
    inner: D,
    landmarker: L,
    failing: bool,
}

impl<D: FaceDetector, L: FaceLandmarker> LandmarkingDetector<D, L> {
    pub fn new(inner: D, landmarker: L) -> Self {
        Self {
            inner,
            landmarker,
            failing: false,
        }
    }

    /// Whether the most recent landmark attempt failed.
    pub fn is_failing(&self) -> bool {
        self.failing
    }

    fn attach(&mut self, frame: &Frame, det: &mut Detection) {
        match self.landmarker.landmarks(frame, &det.bbox) {
            Ok(lm) => {
                if self.failing {
                    log::info!("Landmarks available again");
                    self.failing = false;
                }
                det.landmarks = Some(lm);
            }
            Err(e) if self.failing => log::debug!("Landmarks still unavailable: {e}"),
            Err(e) => {
                log::warn!("Landmarks unavailable: {e}");
                self.failing = true;
            }
        }
    }
}

impl<D: FaceDetector, L: FaceLandmarker> FaceDetector for LandmarkingDetector<D, L> {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        let mut dets = self.inner.detect(frame)?;
        for det in &mut dets {
            self.attach(frame, det);
        }
        Ok(dets)
    }

    /// Landmarks only the winning face.
    fn detect_single(&mut self, frame: &Frame) -> Result<Option<Detection>, DetectionError> {
        let mut best = self.inner.detect_single(frame)?;
        if let Some(ref mut det) = best {
            self.attach(frame, det);
        }
        Ok(best)
    }
}
