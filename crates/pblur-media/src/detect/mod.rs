//! Detector adapters.
//!
//! A [`Detector`] wraps one external detection capability: given a frame it
//! returns bounding boxes with confidence scores for a single class. The
//! pipeline binds two independent instances, one for faces and one for
//! identity documents.

mod onnx;

pub use onnx::OnnxDetector;

use pblur_models::{Detection, DetectionClass};

use crate::error::MediaResult;
use crate::frame::RgbFrame;

/// Black-box detection capability for a single object class.
///
/// Implementations hold their own configuration (confidence threshold,
/// inference resolution) and must not mutate the input frame or retain
/// state between calls.
pub trait Detector: Send + Sync {
    /// Detect objects in `frame`.
    ///
    /// Returns detections in the model's output order (the redaction
    /// policy's tie-breaking depends on this order being stable for a
    /// given input). A failed inference call is an error scoped to this
    /// frame only; the caller degrades it to "zero detections".
    fn detect(&self, frame: &RgbFrame) -> MediaResult<Vec<Detection>>;

    /// The class this adapter is bound to.
    fn class(&self) -> DetectionClass;

    /// Adapter name for logging.
    fn name(&self) -> &'static str;
}
