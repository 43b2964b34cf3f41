use std::sync::{Arc, PoisonError};

use image::imageops::{self, FilterType};

use crate::detection::domain::face_detector::DetectionError;
use crate::detection::domain::face_landmarker::FaceLandmarker;
use crate::detection::domain::face_landmarks::{FaceLandmarks, NUM_LANDMARKS};
use crate::shared::bounding_box::{BoundingBox, PixelRect};
use crate::shared::frame::Frame;

use super::face_models::FaceModels;

/// 68-point landmark regressor running on the face crop.
///
/// The network sees the face box resized to its square input and returns
/// 136 values: `(x, y)` pairs normalized to the crop.
pub struct OnnxLandmarker {
    models: Arc<FaceModels>,
}

impl OnnxLandmarker {
    pub fn new(models: Arc<FaceModels>) -> Self {
        Self { models }
    }
}

impl FaceLandmarker for OnnxLandmarker {
    fn landmarks(
        &mut self,
        frame: &Frame,
        face: &BoundingBox,
    ) -> Result<FaceLandmarks, DetectionError> {
        let rect = face
            .to_pixel_rect(frame.width(), frame.height())
            .ok_or_else(|| DetectionError::Frame("face box lies outside the frame".into()))?;
        let size = self.models.landmark_input_size();
        let tensor = crop_tensor(frame, rect, size)?;

        let input_value = ort::value::Tensor::from_array(tensor)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let mut session = self
            .models
            .landmarker()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(DetectionError::Output("model produced no outputs".into()));
        }
        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Output(e.to_string()))?;
        let values: Vec<f32> = tensor.iter().copied().collect();

        points_from_output(&values, rect)
    }
}

/// Crops `rect` out of the frame and resizes it to an NCHW `[1, 3, size, size]` tensor.
fn crop_tensor(
    frame: &Frame,
    rect: PixelRect,
    size: u32,
) -> Result<ndarray::Array4<f32>, DetectionError> {
    let img = frame
        .to_rgb_image()
        .ok_or_else(|| DetectionError::Frame("expected an RGB frame".into()))?;
    let crop = imageops::crop_imm(&img, rect.x, rect.y, rect.width, rect.height).to_image();
    let resized = imageops::resize(&crop, size, size, FilterType::Triangle);

    let size = size as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, px) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = px[c] as f32 / 255.0;
        }
    }
    Ok(tensor)
}

/// Maps crop-normalized `(x, y)` pairs back into frame pixels.
fn points_from_output(values: &[f32], rect: PixelRect) -> Result<FaceLandmarks, DetectionError> {
    if values.len() != NUM_LANDMARKS * 2 {
        return Err(DetectionError::Output(format!(
            "expected {} landmark values, got {}",
            NUM_LANDMARKS * 2,
            values.len()
        )));
    }
    let points = values
        .chunks_exact(2)
        .map(|p| {
            (
                rect.x as f64 + p[0] as f64 * rect.width as f64,
                rect.y as f64 + p[1] as f64 * rect.height as f64,
            )
        })
        .collect();
    FaceLandmarks::new(points)
        .ok_or_else(|| DetectionError::Output("landmark count mismatch".into()))
}
