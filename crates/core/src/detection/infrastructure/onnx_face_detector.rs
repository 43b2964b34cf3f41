/// Single-stage face detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, thresholding and NMS. The
/// network output is read as YOLO-style rows `[cx, cy, w, h, score, ...]`.
use std::sync::{Arc, PoisonError};

use crate::detection::domain::detection::Detection;
use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::face_models::FaceModels;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Letterbox fill, YOLO convention.
const PAD_VALUE: f32 = 114.0 / 255.0;

/// Face detector running the shared detector session of [`FaceModels`].
pub struct OnnxFaceDetector {
    models: Arc<FaceModels>,
    options: DetectorOptions,
}

impl OnnxFaceDetector {
    pub fn new(models: Arc<FaceModels>, options: DetectorOptions) -> Self {
        Self { models, options }
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        if frame.channels() != 3 {
            return Err(DetectionError::Frame(format!(
                "expected 3 channels, got {}",
                frame.channels()
            )));
        }
        let (fw, fh) = frame.dimensions();
        if fw == 0 || fh == 0 {
            return Err(DetectionError::Frame("empty frame".into()));
        }

        // 1. Preprocess: letterbox + normalize → NCHW float32
        let (input_tensor, lb) = letterbox(frame, self.options.input_size);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let mut session = self
            .models
            .detector()
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
        let shape = tensor.shape().to_vec();
        let data = tensor
            .as_slice()
            .ok_or_else(|| DetectionError::Output("non-contiguous output tensor".into()))?;

        // 3. Decode + threshold, 4. NMS
        let mut dets = decode(data, &shape, self.options.score_threshold, &lb, fw, fh)?;
        let kept = nms(&mut dets, NMS_IOU_THRESH);
        log::trace!("{} face(s) above {}", kept.len(), self.options.score_threshold);
        Ok(kept)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// How a frame was fitted into the square network input.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    /// Maps a point from network input space back to frame pixels.
    fn to_frame(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let mut tensor = ndarray::Array4::<f32>::from_elem(
        (1, 3, target_size as usize, target_size as usize),
        PAD_VALUE,
    );

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize into the padded area
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// `cx, cy, w, h, score`; anything after is ignored.
const MIN_FEATURES: usize = 5;

/// Layout of a `[1, a, b]` output: `Some(true)` for feature-major
/// `[1, F, N]`, `Some(false)` for row-major `[1, N, F]`, `None` when neither
/// axis can hold a full prediction.
///
/// Row-major wins unless only the middle axis is wide enough, or both are
/// and predictions outnumber features.
fn is_feature_major(a: usize, b: usize) -> Option<bool> {
    if b >= MIN_FEATURES && (a < MIN_FEATURES || a >= b) {
        Some(false)
    } else if a >= MIN_FEATURES {
        Some(true)
    } else {
        None
    }
}

/// Turns raw `[1, F, N]` or `[1, N, F]` predictions into frame-space faces.
fn decode(
    data: &[f32],
    shape: &[usize],
    threshold: f64,
    lb: &Letterbox,
    frame_w: u32,
    frame_h: u32,
) -> Result<Vec<Detection>, DetectionError> {
    if shape.len() != 3 {
        return Err(DetectionError::Output(format!(
            "unexpected output shape {shape:?}"
        )));
    }
    let Some(transposed) = is_feature_major(shape[1], shape[2]) else {
        return Err(DetectionError::Output(format!(
            "expected at least {MIN_FEATURES} values per prediction, got shape {shape:?}"
        )));
    };
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if data.len() < num_dets * num_feats {
        return Err(DetectionError::Output("output tensor truncated".into()));
    }

    let value = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    let mut dets = Vec::new();
    for i in 0..num_dets {
        let score = value(i, 4);
        if score < threshold {
            continue;
        }
        let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
        let (x1, y1) = lb.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = lb.to_frame(cx + w / 2.0, cy + h / 2.0);
        let bbox = BoundingBox::from_corners(x1, y1, x2, y2).clip_to(frame_w, frame_h);
        if bbox.is_empty() {
            continue;
        }
        dets.push(Detection::new(bbox, score.min(1.0)));
    }
    Ok(dets)
}

/// Greedy NMS: sort by score descending, suppress overlapping boxes.
fn nms(dets: &mut [Detection], iou_thresh: f64) -> Vec<Detection> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    for d in dets.iter() {
        if keep.iter().all(|k| k.bbox.iou(&d.bbox) <= iou_thresh) {
            keep.push(d.clone());
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
