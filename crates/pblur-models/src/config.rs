//! Redaction configuration and tuning presets.
//!
//! One `RedactionConfig` value is built at startup and passed into the
//! stream pump; there is no hot reload. The three presets correspond to
//! different latency/accuracy trade-offs of the same pipeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Gaussian blur parameters for one redaction class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BlurSettings {
    /// Kernel size in pixels. Must be odd and >= 3.
    pub kernel: u32,
    /// Gaussian standard deviation.
    pub sigma: f32,
}

impl BlurSettings {
    pub fn new(kernel: u32, sigma: f32) -> Self {
        Self { kernel, sigma }
    }
}

/// Configuration for one detector adapter binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectorSettings {
    /// Path to the ONNX model file.
    pub model_path: String,
    /// Minimum confidence for a detection to be reported, in (0, 1].
    pub confidence_threshold: f32,
    /// Square inference resolution the model expects.
    pub input_size: u32,
}

/// Pipeline tuning knobs, read once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RedactionConfig {
    /// Process every Nth captured frame; the rest are dropped unprocessed.
    pub stride: u32,
    /// Width frames are resized to before detection (4:3 aspect).
    pub target_width: u32,
    /// Confidence threshold for the face detector.
    pub face_confidence: f32,
    /// Confidence threshold for the identity-document detector.
    pub doc_confidence: f32,
    /// Blur applied to non-primary faces.
    pub face_blur: BlurSettings,
    /// Blur applied to identity documents (stronger anonymization).
    pub doc_blur: BlurSettings,
    /// Minimum plausible document box area in pixels (inclusive).
    pub doc_area_min: i64,
    /// Maximum plausible document box area in pixels (inclusive).
    pub doc_area_max: i64,
    /// JPEG quality for the output stream, 1-100.
    pub jpeg_quality: u8,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        TuningPreset::Balanced.config()
    }
}

impl RedactionConfig {
    /// Target frame height at a 4:3 aspect ratio.
    pub fn target_height(&self) -> u32 {
        self.target_width * 3 / 4
    }

    /// Validate invariants that the rest of the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stride == 0 {
            return Err(ConfigError::InvalidStride);
        }
        if self.target_width < 4 {
            return Err(ConfigError::InvalidTargetWidth(self.target_width));
        }
        for (name, threshold) in [
            ("face_confidence", self.face_confidence),
            ("doc_confidence", self.doc_confidence),
        ] {
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(ConfigError::InvalidThreshold {
                    name,
                    value: threshold,
                });
            }
        }
        for (name, blur) in [("face_blur", self.face_blur), ("doc_blur", self.doc_blur)] {
            if blur.kernel < 3 || blur.kernel % 2 == 0 {
                return Err(ConfigError::InvalidKernel {
                    name,
                    kernel: blur.kernel,
                });
            }
            if blur.sigma <= 0.0 {
                return Err(ConfigError::InvalidSigma {
                    name,
                    sigma: blur.sigma,
                });
            }
        }
        if self.doc_area_min < 0 || self.doc_area_max < self.doc_area_min {
            return Err(ConfigError::InvalidAreaGate {
                min: self.doc_area_min,
                max: self.doc_area_max,
            });
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::InvalidJpegQuality(self.jpeg_quality));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("stride must be >= 1")]
    InvalidStride,

    #[error("target width too small: {0}")]
    InvalidTargetWidth(u32),

    #[error("{name} must be in (0, 1], got {value}")]
    InvalidThreshold { name: &'static str, value: f32 },

    #[error("{name} kernel must be odd and >= 3, got {kernel}")]
    InvalidKernel { name: &'static str, kernel: u32 },

    #[error("{name} sigma must be positive, got {sigma}")]
    InvalidSigma { name: &'static str, sigma: f32 },

    #[error("document area gate invalid: [{min}, {max}]")]
    InvalidAreaGate { min: i64, max: i64 },

    #[error("jpeg quality must be 1-100, got {0}")]
    InvalidJpegQuality(u8),
}

/// Named tuning preset.
///
/// The presets trade detection accuracy for per-frame latency; all three
/// run the identical pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TuningPreset {
    /// Smallest frames, largest stride. Lowest latency.
    Fast,
    /// Middle ground between speed and accuracy.
    #[default]
    Balanced,
    /// Full resolution, every frame. Highest accuracy.
    Accurate,
}

impl TuningPreset {
    pub const ALL: &'static [TuningPreset] = &[
        TuningPreset::Fast,
        TuningPreset::Balanced,
        TuningPreset::Accurate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TuningPreset::Fast => "fast",
            TuningPreset::Balanced => "balanced",
            TuningPreset::Accurate => "accurate",
        }
    }

    /// The full configuration this preset expands to.
    pub fn config(&self) -> RedactionConfig {
        match self {
            TuningPreset::Fast => RedactionConfig {
                stride: 3,
                target_width: 320,
                face_confidence: 0.3,
                doc_confidence: 0.5,
                face_blur: BlurSettings::new(11, 8.0),
                doc_blur: BlurSettings::new(31, 30.0),
                doc_area_min: 800,
                doc_area_max: 80_000,
                jpeg_quality: 60,
            },
            TuningPreset::Balanced => RedactionConfig {
                stride: 2,
                target_width: 480,
                face_confidence: 0.4,
                doc_confidence: 0.5,
                face_blur: BlurSettings::new(17, 15.0),
                doc_blur: BlurSettings::new(31, 30.0),
                doc_area_min: 800,
                doc_area_max: 80_000,
                jpeg_quality: 70,
            },
            TuningPreset::Accurate => RedactionConfig {
                stride: 1,
                target_width: 640,
                face_confidence: 0.3,
                doc_confidence: 0.5,
                face_blur: BlurSettings::new(23, 30.0),
                doc_blur: BlurSettings::new(51, 50.0),
                doc_area_min: 1_000,
                doc_area_max: 100_000,
                jpeg_quality: 85,
            },
        }
    }
}

impl fmt::Display for TuningPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown tuning preset: {0}")]
pub struct TuningPresetParseError(String);

impl FromStr for TuningPreset {
    type Err = TuningPresetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(TuningPreset::Fast),
            "balanced" => Ok(TuningPreset::Balanced),
            "accurate" => Ok(TuningPreset::Accurate),
            other => Err(TuningPresetParseError(other.to_string())),
        }
    }
}
