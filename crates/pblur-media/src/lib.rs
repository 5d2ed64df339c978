//! Video capture and privacy redaction pipeline.
//!
//! This crate owns everything between a camera URL and a stream of
//! redacted JPEG frames: FFmpeg-backed capture, ONNX face and identity
//! document detection, the selective blur policy, the frame pump, and the
//! single-slot session lifecycle. The HTTP surface lives in `pblur-api`.

pub mod detect;
pub mod error;
pub mod frame;
pub mod processor;
pub mod pump;
pub mod redact;
pub mod session;
pub mod source;

pub use detect::{Detector, OnnxDetector};
pub use error::{MediaError, MediaResult};
pub use frame::RgbFrame;
pub use processor::FrameProcessor;
pub use pump::{PumpOutcome, StreamPump};
pub use redact::{RedactionPolicy, DEFAULT_FONT_PATH};
pub use session::{SessionManager, SessionState};
pub use source::{FfmpegSource, FfmpegSourceFactory, FrameSource, SourceFactory};
