use std::sync::Arc;

use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_detector::FaceDetector;

use super::face_models::FaceModels;
use super::landmarking_detector::LandmarkingDetector;
use super::onnx_face_detector::OnnxFaceDetector;
use super::onnx_landmarker::OnnxLandmarker;

/// Creates the single-face detector over the shared models, optionally
/// attaching 68-point landmarks to each result.
pub fn create_detector(
    models: Arc<FaceModels>,
    options: DetectorOptions,
    with_landmarks: bool,
) -> Box<dyn FaceDetector> {
    log::info!(
        "Face detector: input {}px, threshold {}{}",
        options.input_size,
        options.score_threshold,
        if with_landmarks { ", with landmarks" } else { "" }
    );
    let detector = OnnxFaceDetector::new(models.clone(), options);
    if with_landmarks {
        Box::new(LandmarkingDetector::new(detector, OnnxLandmarker::new(models)))
    } else {
        Box::new(detector)
    }
}
