pub const DETECTOR_MODEL_NAME: &str = "tiny_face_detector.onnx";
pub const LANDMARK_MODEL_NAME: &str = "face_landmark_68.onnx";

/// Model directory used when none is configured.
pub const DEFAULT_MODEL_BASE: &str = "models";

/// Detector input resolution (square, multiple of 32).
pub const DEFAULT_INPUT_SIZE: u32 = 416;

/// Minimum score for a detection to count as a face.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.5;

pub const POLL_INTERVAL_MS: u64 = 100;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
