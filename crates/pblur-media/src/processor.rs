//! Per-frame orchestration: detectors in, redacted frame out.

use std::sync::Arc;

use tracing::warn;

use pblur_models::Detection;

use crate::detect::Detector;
use crate::frame::RgbFrame;
use crate::redact::RedactionPolicy;

/// Runs both detector adapters against a pristine frame and hands the
/// combined detection set to the redaction policy.
///
/// Stateless across frames: each call is a pure function of its inputs
/// aside from the two external detector calls.
pub struct FrameProcessor {
    face_detector: Arc<dyn Detector>,
    doc_detector: Arc<dyn Detector>,
    policy: RedactionPolicy,
}

impl FrameProcessor {
    pub fn new(
        face_detector: Arc<dyn Detector>,
        doc_detector: Arc<dyn Detector>,
        policy: RedactionPolicy,
    ) -> Self {
        Self {
            face_detector,
            doc_detector,
            policy,
        }
    }

    /// Process one frame into its annotated, selectively blurred copy.
    ///
    /// Both detectors run against the original frame, never the output
    /// buffer, so detection is never biased by blurring within the same
    /// frame. The output buffer is only mutated once both detection calls
    /// have returned.
    pub fn process(&self, frame: &RgbFrame) -> RgbFrame {
        let faces = self.run_detector(self.face_detector.as_ref(), frame);
        let documents = self.run_detector(self.doc_detector.as_ref(), frame);

        let mut output = frame.to_image();
        self.policy.apply(&mut output, &faces, &documents);
        RgbFrame::from_image(output)
    }

    /// Run one detector; a failed call degrades to zero detections for
    /// this frame only and must never kill the session.
    fn run_detector(&self, detector: &dyn Detector, frame: &RgbFrame) -> Vec<Detection> {
        match detector.detect(frame) {
            Ok(detections) => detections,
            Err(e) => {
                warn!(
                    detector = detector.name(),
                    class = %detector.class(),
                    error = %e,
                    "Detection failed, treating as zero detections for this frame"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use image::{Rgb, RgbImage};

    use pblur_models::{DetectionClass, PixelRect, RedactionConfig};

    use crate::error::{MediaError, MediaResult};

    /// Detector stub that replays a scripted sequence of results.
    struct ScriptedDetector {
        class: DetectionClass,
        script: Mutex<VecDeque<MediaResult<Vec<Detection>>>>,
    }

    impl ScriptedDetector {
        fn new(
            class: DetectionClass,
            script: Vec<MediaResult<Vec<Detection>>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                class,
                script: Mutex::new(script.into()),
            })
        }
    }

    impl Detector for ScriptedDetector {
        fn detect(&self, _frame: &RgbFrame) -> MediaResult<Vec<Detection>> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        fn class(&self) -> DetectionClass {
            self.class
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn gradient_frame(width: u32, height: u32) -> RgbFrame {
        RgbFrame::from_image(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 40])
        }))
    }

    fn face(x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
        Detection::new(PixelRect::new(x1, y1, x2, y2), 0.9, DetectionClass::Face)
    }

    fn document(x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
        Detection::new(
            PixelRect::new(x1, y1, x2, y2),
            0.8,
            DetectionClass::IdDocument,
        )
    }

    fn processor(
        face_script: Vec<MediaResult<Vec<Detection>>>,
        doc_script: Vec<MediaResult<Vec<Detection>>>,
    ) -> FrameProcessor {
        FrameProcessor::new(
            ScriptedDetector::new(DetectionClass::Face, face_script),
            ScriptedDetector::new(DetectionClass::IdDocument, doc_script),
            RedactionPolicy::new(RedactionConfig::default()),
        )
    }

    #[test]
    fn test_input_frame_is_never_mutated() {
        let frame = gradient_frame(160, 120);
        let pristine = frame.clone();
        let p = processor(
            vec![Ok(vec![face(10, 10, 60, 60), face(80, 10, 120, 40)])],
            vec![Ok(vec![document(20, 70, 100, 110)])],
        );
        let _ = p.process(&frame);
        assert_eq!(frame, pristine);
    }

    #[test]
    fn test_no_detections_returns_identical_copy() {
        let frame = gradient_frame(80, 60);
        let p = processor(vec![Ok(Vec::new())], vec![Ok(Vec::new())]);
        assert_eq!(p.process(&frame), frame);
    }

    #[test]
    fn test_detector_failure_isolation() {
        let frame = gradient_frame(160, 120);
        // Frame 1: face detector fails, document detector succeeds.
        // Frame 2: both succeed.
        let p = processor(
            vec![
                Err(MediaError::detection_failed("inference crashed")),
                Ok(vec![face(10, 10, 60, 60), face(80, 10, 120, 40)]),
            ],
            vec![
                Ok(vec![document(20, 70, 100, 110)]),
                Ok(Vec::new()),
            ],
        );

        // Frame 1: document still redacted, zero face annotations.
        let out1 = p.process(&frame);
        let img1 = out1.to_image();
        let pristine = frame.to_image();
        let mut doc_changed = false;
        for y in 75..105 {
            for x in 25..95 {
                if img1.get_pixel(x, y) != pristine.get_pixel(x, y) {
                    doc_changed = true;
                }
            }
        }
        assert!(doc_changed, "document not redacted while face detector down");
        // No face annotation: the face regions (away from the document box)
        // are untouched.
        for y in 10..60 {
            for x in 105..120 {
                assert_eq!(img1.get_pixel(x, y), pristine.get_pixel(x, y));
            }
        }

        // Frame 2: face detection attempted normally again.
        let out2 = p.process(&frame);
        let img2 = out2.to_image();
        let mut background_face_blurred = false;
        for y in 15..35 {
            for x in 85..115 {
                if img2.get_pixel(x, y) != pristine.get_pixel(x, y) {
                    background_face_blurred = true;
                }
            }
        }
        assert!(background_face_blurred, "no persisted failure state expected");
    }

    #[test]
    fn test_both_detectors_failing_yields_unchanged_frame() {
        let frame = gradient_frame(80, 60);
        let p = processor(
            vec![Err(MediaError::detection_failed("down"))],
            vec![Err(MediaError::detection_failed("down"))],
        );
        assert_eq!(p.process(&frame), frame);
    }
}
