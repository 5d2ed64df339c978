//! Shared data models for the Privacy Blur backend.
//!
//! This crate provides Serde-serializable types for:
//! - Pixel-space bounding rectangles
//! - Detections (face / identity document) with confidence scores
//! - Redaction configuration and tuning presets

pub mod config;
pub mod detection;
pub mod rect;

// Re-export common types
pub use config::{BlurSettings, DetectorSettings, RedactionConfig, TuningPreset};
pub use detection::{Detection, DetectionClass, DetectionClassParseError};
pub use rect::PixelRect;
