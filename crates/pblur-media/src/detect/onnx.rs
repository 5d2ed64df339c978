//! YOLOv8-style ONNX detector adapter.
//!
//! Runs a single-class (or few-class) YOLOv8 detection model through ONNX
//! Runtime. Output layout is `[1, 4 + C, N]`: four box coordinates in
//! center form followed by per-class scores, stored column-major across
//! the N anchor candidates.

use std::path::Path;
use std::sync::Mutex;

use image::imageops::{self, FilterType};
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use pblur_models::{Detection, DetectionClass, DetectorSettings, PixelRect};

use crate::error::{MediaError, MediaResult};
use crate::frame::RgbFrame;

/// IoU threshold for greedy NMS.
const NMS_IOU_THRESHOLD: f32 = 0.45;

/// ONNX Runtime detector bound to one detection class.
#[derive(Debug)]
pub struct OnnxDetector {
    session: Mutex<Session>,
    settings: DetectorSettings,
    class: DetectionClass,
}

impl OnnxDetector {
    /// Load the model named in `settings` and bind it to `class`.
    ///
    /// Returns `ModelNotFound` if the model file does not exist.
    pub fn new(settings: DetectorSettings, class: DetectionClass) -> MediaResult<Self> {
        let model_path = Path::new(&settings.model_path);
        if !model_path.exists() {
            return Err(MediaError::model_not_found(&settings.model_path));
        }

        let session = Session::builder()
            .map_err(|e| MediaError::internal(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| MediaError::internal(format!("Failed to set optimization level: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| MediaError::internal(format!("Failed to load ONNX model: {e}")))?;

        info!(
            model_path = %settings.model_path,
            input_size = settings.input_size,
            class = %class,
            "Detector initialized"
        );

        Ok(Self {
            session: Mutex::new(session),
            settings,
            class,
        })
    }

    /// Preprocess: resize to the square input size, normalize to [0, 1],
    /// pack as an NCHW float tensor.
    fn preprocess(&self, frame: &RgbFrame) -> MediaResult<ort::value::DynValue> {
        let size = self.settings.input_size;
        let resized = imageops::resize(&frame.to_image(), size, size, FilterType::Triangle);
        let raw = resized.as_raw();

        let plane = (size * size) as usize;
        let mut chw = vec![0f32; 3 * plane];
        for idx in 0..plane {
            chw[idx] = raw[idx * 3] as f32 / 255.0;
            chw[plane + idx] = raw[idx * 3 + 1] as f32 / 255.0;
            chw[2 * plane + idx] = raw[idx * 3 + 2] as f32 / 255.0;
        }

        let shape = [1usize, 3, size as usize, size as usize];
        Ok(Tensor::from_array((shape, chw.into_boxed_slice()))
            .map_err(|e| MediaError::detection_failed(format!("Failed to create tensor: {e}")))?
            .into_dyn())
    }

    /// Postprocess the `[1, 4 + C, N]` output into clamped pixel rects.
    fn postprocess(
        &self,
        shape: &[i64],
        data: &[f32],
        frame_width: u32,
        frame_height: u32,
    ) -> MediaResult<Vec<Detection>> {
        if shape.len() != 3 || shape[1] < 5 {
            return Err(MediaError::detection_failed(format!(
                "Unexpected detector output shape: {shape:?}"
            )));
        }
        let num_features = shape[1] as usize;
        let num_anchors = shape[2] as usize;
        let num_classes = num_features - 4;

        if data.len() != num_features * num_anchors {
            return Err(MediaError::detection_failed(format!(
                "Detector output size mismatch: expected {}, got {}",
                num_features * num_anchors,
                data.len()
            )));
        }

        // Reshape: output is [1, 4 + C, N], transpose to [N, 4 + C] so one
        // row holds one anchor candidate.
        let output = Array::from_shape_vec((num_features, num_anchors), data.to_vec())
            .map_err(|e| MediaError::detection_failed(format!("Failed to reshape output: {e}")))?;
        let anchors = output.t();

        let input_size = self.settings.input_size as f32;
        let scale_x = frame_width as f32 / input_size;
        let scale_y = frame_height as f32 / input_size;

        let mut candidates = Vec::new();
        for i in 0..num_anchors {
            // Row layout: [cx, cy, w, h, cls0, cls1, ...]
            let cx = anchors[[i, 0]];
            let cy = anchors[[i, 1]];
            let w = anchors[[i, 2]];
            let h = anchors[[i, 3]];

            let mut best_score = 0f32;
            for c in 0..num_classes {
                let score = anchors[[i, 4 + c]];
                if score > best_score {
                    best_score = score;
                }
            }

            if best_score < self.settings.confidence_threshold {
                continue;
            }

            let rect = PixelRect::new(
                ((cx - w / 2.0) * scale_x) as i32,
                ((cy - h / 2.0) * scale_y) as i32,
                ((cx + w / 2.0) * scale_x) as i32,
                ((cy + h / 2.0) * scale_y) as i32,
            );
            let Some(rect) = rect.clamp_to(frame_width, frame_height) else {
                continue;
            };

            candidates.push(Detection::new(rect, best_score, self.class));
        }

        Ok(non_maximum_suppression(candidates, NMS_IOU_THRESHOLD))
    }
}

impl super::Detector for OnnxDetector {
    fn detect(&self, frame: &RgbFrame) -> MediaResult<Vec<Detection>> {
        let input = self.preprocess(frame)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::internal("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs!["images" => input])
            .map_err(|e| MediaError::detection_failed(format!("ONNX inference failed: {e}")))?;

        let (shape, data) = outputs["output0"]
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::detection_failed(format!("Failed to extract tensor: {e}")))?;

        let detections = self.postprocess(shape, data, frame.width, frame.height)?;
        debug!(class = %self.class, count = detections.len(), "Detection completed");
        Ok(detections)
    }

    fn class(&self) -> DetectionClass {
        self.class
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn non_maximum_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i]);
        for j in (i + 1)..detections.len() {
            if !suppressed[j] && iou(&detections[i].rect, &detections[j].rect) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Intersection over union of two pixel rects.
fn iou(a: &PixelRect, b: &PixelRect) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);

    let inter = (ix2 - ix1).max(0) as f32 * (iy2 - iy1).max(0) as f32;
    if inter == 0.0 {
        return 0.0;
    }
    let union = (a.area() + b.area()) as f32 - inter;
    inter / union
}
