use thiserror::Error;

use crate::shared::constants::{DEFAULT_INPUT_SIZE, DEFAULT_SCORE_THRESHOLD};

#[derive(Error, Debug, PartialEq)]
pub enum OptionsError {
    #[error("input size must be a positive multiple of 32, got {0}")]
    InputSize(u32),
    #[error("score threshold must be in (0, 1], got {0}")]
    ScoreThreshold(f64),
}

/// Parameters of a single-face detection call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorOptions {
    /// Square network input resolution. Larger finds smaller faces, slower.
    pub input_size: u32,
    /// Detections scoring below this are discarded.
    pub score_threshold: f64,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }
}

impl DetectorOptions {
    pub fn new(input_size: u32, score_threshold: f64) -> Result<Self, OptionsError> {
        if input_size == 0 || input_size % 32 != 0 {
            return Err(OptionsError::InputSize(input_size));
        }
        if !(score_threshold > 0.0 && score_threshold <= 1.0) {
            return Err(OptionsError::ScoreThreshold(score_threshold));
        }
        Ok(Self {
            input_size,
            score_threshold,
        })
    }
}
