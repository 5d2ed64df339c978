//! API configuration.

use pblur_models::{RedactionConfig, TuningPreset};

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Processing preset applied to every session
    pub preset: TuningPreset,
    /// Face detection model path
    pub face_model_path: String,
    /// Identity document detection model path
    pub doc_model_path: String,
    /// Square inference resolution for the face model; defaults to the
    /// preset's working width
    pub face_input_size: Option<u32>,
    /// Square inference resolution for the document model; defaults to the
    /// preset's working width
    pub doc_input_size: Option<u32>,
    /// Label font path (optional asset; outlines only when missing)
    pub font_path: String,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            preset: TuningPreset::default(),
            face_model_path: "models/face.onnx".to_string(),
            doc_model_path: "models/id_card.onnx".to_string(),
            face_input_size: None,
            doc_input_size: None,
            font_path: pblur_media::DEFAULT_FONT_PATH.to_string(),
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            preset: std::env::var("PBLUR_PRESET")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.preset),
            face_model_path: std::env::var("FACE_MODEL_PATH").unwrap_or(defaults.face_model_path),
            doc_model_path: std::env::var("DOC_MODEL_PATH").unwrap_or(defaults.doc_model_path),
            face_input_size: env_parse("FACE_MODEL_INPUT_SIZE"),
            doc_input_size: env_parse("DOC_MODEL_INPUT_SIZE"),
            font_path: std::env::var("LABEL_FONT_PATH").unwrap_or(defaults.font_path),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Inference resolution for the face detector: the explicit override,
    /// or the preset's working width.
    pub fn face_detector_input(&self, redaction: &RedactionConfig) -> u32 {
        self.face_input_size.unwrap_or(redaction.target_width)
    }

    /// Inference resolution for the document detector: the explicit
    /// override, or the preset's working width.
    pub fn doc_detector_input(&self, redaction: &RedactionConfig) -> u32 {
        self.doc_input_size.unwrap_or(redaction.target_width)
    }

    /// Expand the preset, then apply individual env overrides on top.
    pub fn redaction_config(&self) -> RedactionConfig {
        let mut config = self.preset.config();
        if let Some(stride) = env_parse("PBLUR_STRIDE") {
            config.stride = stride;
        }
        if let Some(width) = env_parse("PBLUR_TARGET_WIDTH") {
            config.target_width = width;
        }
        if let Some(confidence) = env_parse("PBLUR_FACE_CONFIDENCE") {
            config.face_confidence = confidence;
        }
        if let Some(confidence) = env_parse("PBLUR_DOC_CONFIDENCE") {
            config.doc_confidence = confidence;
        }
        if let Some(kernel) = env_parse("PBLUR_FACE_BLUR_KERNEL") {
            config.face_blur.kernel = kernel;
        }
        if let Some(sigma) = env_parse("PBLUR_FACE_BLUR_SIGMA") {
            config.face_blur.sigma = sigma;
        }
        if let Some(kernel) = env_parse("PBLUR_DOC_BLUR_KERNEL") {
            config.doc_blur.kernel = kernel;
        }
        if let Some(sigma) = env_parse("PBLUR_DOC_BLUR_SIGMA") {
            config.doc_blur.sigma = sigma;
        }
        if let Some(min) = env_parse("PBLUR_DOC_AREA_MIN") {
            config.doc_area_min = min;
        }
        if let Some(max) = env_parse("PBLUR_DOC_AREA_MAX") {
            config.doc_area_max = max;
        }
        if let Some(quality) = env_parse("PBLUR_JPEG_QUALITY") {
            config.jpeg_quality = quality;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preset_is_balanced() {
        let config = ApiConfig::default();
        assert_eq!(config.preset, TuningPreset::Balanced);
        assert!(!config.is_production());
    }

    #[test]
    fn test_redaction_config_expands_preset() {
        // Asserted fields are never touched by the env-override tests, so
        // this is safe under parallel test execution.
        let config = ApiConfig {
            preset: TuningPreset::Fast,
            ..ApiConfig::default()
        };
        let redaction = config.redaction_config();
        assert_eq!(redaction.stride, 3);
        assert_eq!(redaction.target_width, 320);
        assert_eq!(redaction.jpeg_quality, 60);
    }

    #[test]
    fn test_blur_and_area_gate_env_overrides() {
        std::env::set_var("PBLUR_FACE_BLUR_SIGMA", "25.5");
        std::env::set_var("PBLUR_DOC_AREA_MIN", "1234");
        let config = ApiConfig {
            preset: TuningPreset::Balanced,
            ..ApiConfig::default()
        };
        let redaction = config.redaction_config();
        std::env::remove_var("PBLUR_FACE_BLUR_SIGMA");
        std::env::remove_var("PBLUR_DOC_AREA_MIN");

        assert_eq!(redaction.face_blur.sigma, 25.5);
        assert_eq!(redaction.doc_area_min, 1234);
        // Untouched values keep the preset expansion.
        assert_eq!(redaction.doc_area_max, 80_000);
        assert_eq!(redaction.doc_blur.sigma, 30.0);
    }

    #[test]
    fn test_from_env_reads_preset() {
        std::env::set_var("PBLUR_PRESET", "accurate");
        let config = ApiConfig::from_env();
        std::env::remove_var("PBLUR_PRESET");
        assert_eq!(config.preset, TuningPreset::Accurate);
    }

    #[test]
    fn test_detector_input_follows_preset_width() {
        let config = ApiConfig {
            preset: TuningPreset::Fast,
            ..ApiConfig::default()
        };
        let redaction = config.preset.config();
        assert_eq!(config.face_detector_input(&redaction), 320);
        assert_eq!(config.doc_detector_input(&redaction), 320);
    }

    #[test]
    fn test_detector_input_override_wins() {
        let config = ApiConfig {
            preset: TuningPreset::Balanced,
            face_input_size: Some(640),
            ..ApiConfig::default()
        };
        let redaction = config.preset.config();
        assert_eq!(config.face_detector_input(&redaction), 640);
        assert_eq!(config.doc_detector_input(&redaction), 480);
    }
}
