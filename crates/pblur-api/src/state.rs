//! Application state.

use std::sync::Arc;

use pblur_media::{
    FfmpegSourceFactory, FrameProcessor, MediaError, OnnxDetector, RedactionPolicy, SessionManager,
    SourceFactory,
};
use pblur_models::{DetectionClass, DetectorSettings};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    /// Create the production state: ONNX detectors, FFmpeg capture.
    pub fn new(config: ApiConfig) -> Result<Self, MediaError> {
        let redaction = config.redaction_config();
        redaction
            .validate()
            .map_err(|e| MediaError::internal(format!("Invalid redaction config: {e}")))?;

        let face_detector = Arc::new(OnnxDetector::new(
            DetectorSettings {
                model_path: config.face_model_path.clone(),
                confidence_threshold: redaction.face_confidence,
                input_size: config.face_detector_input(&redaction),
            },
            DetectionClass::Face,
        )?);
        let doc_detector = Arc::new(OnnxDetector::new(
            DetectorSettings {
                model_path: config.doc_model_path.clone(),
                confidence_threshold: redaction.doc_confidence,
                input_size: config.doc_detector_input(&redaction),
            },
            DetectionClass::IdDocument,
        )?);

        let policy =
            RedactionPolicy::new(redaction.clone()).with_font_if_available(&config.font_path);
        let processor = Arc::new(FrameProcessor::new(face_detector, doc_detector, policy));
        let sessions = Arc::new(SessionManager::new(
            Arc::new(FfmpegSourceFactory),
            processor,
            redaction,
        ));

        Ok(Self { config, sessions })
    }

    /// Assemble state from pre-built parts. Used by tests to inject fake
    /// detectors and sources.
    pub fn from_parts(config: ApiConfig, sessions: Arc<SessionManager>) -> Self {
        Self { config, sessions }
    }

    /// Convenience for swapping the capture backend while keeping the
    /// production processor wiring.
    pub fn with_factory(
        config: ApiConfig,
        factory: Arc<dyn SourceFactory>,
        processor: Arc<FrameProcessor>,
    ) -> Self {
        let redaction = config.preset.config();
        let sessions = Arc::new(SessionManager::new(factory, processor, redaction));
        Self { config, sessions }
    }
}
