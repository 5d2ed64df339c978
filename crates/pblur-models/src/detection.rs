//! Detection results produced by the detector adapters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::rect::PixelRect;

/// The object class a detector adapter is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DetectionClass {
    /// A human face.
    Face,
    /// An identification card or similar identity document.
    IdDocument,
}

impl DetectionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionClass::Face => "face",
            DetectionClass::IdDocument => "id_document",
        }
    }
}

impl fmt::Display for DetectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown detection class: {0}")]
pub struct DetectionClassParseError(String);

impl FromStr for DetectionClass {
    type Err = DetectionClassParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "face" => Ok(DetectionClass::Face),
            "id_document" => Ok(DetectionClass::IdDocument),
            other => Err(DetectionClassParseError(other.to_string())),
        }
    }
}

/// One detector output: a bounding box, a confidence score, a class label.
///
/// Created by a detector adapter call, consumed by the redaction policy
/// within the same frame, then discarded. No identity persists across
/// frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    /// Bounding box in pixel coordinates of the processed frame.
    pub rect: PixelRect,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
    /// Object class.
    pub class: DetectionClass,
}

impl Detection {
    pub fn new(rect: PixelRect, confidence: f32, class: DetectionClass) -> Self {
        Self {
            rect,
            confidence,
            class,
        }
    }

    /// Bounding box area in pixels.
    pub fn area(&self) -> i64 {
        self.rect.area()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_roundtrip() {
        for class in [DetectionClass::Face, DetectionClass::IdDocument] {
            assert_eq!(class.as_str().parse::<DetectionClass>().unwrap(), class);
        }
    }

    #[test]
    fn test_class_parse_error() {
        assert!("passport".parse::<DetectionClass>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&DetectionClass::IdDocument).unwrap();
        assert_eq!(json, "\"id_document\"");
    }

    #[test]
    fn test_detection_area() {
        let det = Detection::new(PixelRect::new(0, 0, 20, 10), 0.9, DetectionClass::Face);
        assert_eq!(det.area(), 200);
    }
}
