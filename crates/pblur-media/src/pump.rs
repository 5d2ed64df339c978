//! The streaming loop: source frames in, encoded JPEG frames out.
//!
//! One pump instance owns one capture session. It reads raw frames from a
//! [`FrameSource`], drops frames per the configured stride, resizes to the
//! working resolution, runs the frame processor, and pushes JPEG bytes into
//! a bounded channel consumed by the HTTP transport. The channel depth of
//! one gives natural backpressure: a slow consumer stalls the pump instead
//! of growing a queue of stale frames.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use pblur_models::RedactionConfig;

use crate::processor::FrameProcessor;
use crate::source::FrameSource;

/// Why a pump run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// The source reached EOF or disconnected.
    SourceEnded,
    /// A stop was requested through the session.
    Stopped,
    /// The consumer dropped the frame channel (viewer disconnected).
    ClientDisconnected,
    /// A frame read failed.
    SourceFailed,
}

/// Drives one capture session to completion.
pub struct StreamPump {
    processor: Arc<FrameProcessor>,
    config: RedactionConfig,
}

impl StreamPump {
    pub fn new(processor: Arc<FrameProcessor>, config: RedactionConfig) -> Self {
        Self { processor, config }
    }

    /// Run the loop until the source ends, a stop is requested, or the
    /// consumer goes away. Always closes the source before returning.
    pub async fn run(
        &self,
        mut source: Box<dyn FrameSource>,
        frames: mpsc::Sender<Bytes>,
        mut stop: watch::Receiver<bool>,
    ) -> PumpOutcome {
        let outcome = self.pump_frames(source.as_mut(), &frames, &mut stop).await;
        source.close().await;
        info!(outcome = ?outcome, "Stream pump finished");
        outcome
    }

    async fn pump_frames(
        &self,
        source: &mut dyn FrameSource,
        frames: &mpsc::Sender<Bytes>,
        stop: &mut watch::Receiver<bool>,
    ) -> PumpOutcome {
        let target_width = self.config.target_width;
        let target_height = self.config.target_height();
        let mut frame_index: u64 = 0;
        let mut emitted: u64 = 0;

        loop {
            let frame = tokio::select! {
                _ = wait_for_stop(stop) => return PumpOutcome::Stopped,
                result = source.read_frame() => match result {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        debug!(frames = frame_index, emitted, "Source ended");
                        return PumpOutcome::SourceEnded;
                    }
                    Err(e) => {
                        warn!(error = %e, "Frame read failed, ending session");
                        return PumpOutcome::SourceFailed;
                    }
                },
            };

            // Stride counting is 1-based: with stride 3, frames 3, 6, 9...
            // are processed and the rest dropped.
            frame_index += 1;
            if frame_index % self.config.stride as u64 != 0 {
                continue;
            }

            let resized = frame.resize(target_width, target_height);
            let processed = self.processor.process(&resized);
            let jpeg = match processed.encode_jpeg(self.config.jpeg_quality) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "JPEG encode failed, dropping frame");
                    continue;
                }
            };

            // The channel is full while the viewer lags, so the send must
            // stay interruptible by a stop request.
            let sent = tokio::select! {
                _ = wait_for_stop(stop) => return PumpOutcome::Stopped,
                sent = frames.send(Bytes::from(jpeg)) => sent,
            };
            if sent.is_err() {
                debug!(frames = frame_index, emitted, "Viewer disconnected");
                return PumpOutcome::ClientDisconnected;
            }
            emitted += 1;
        }
    }
}

/// Resolve once a stop has been requested. A dropped stop sender counts as
/// a stop: the owning session is gone.
async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use image::{Rgb, RgbImage};

    use pblur_models::{DetectionClass, TuningPreset};

    use crate::detect::Detector;
    use crate::error::MediaResult;
    use crate::frame::RgbFrame;
    use crate::redact::RedactionPolicy;

    /// Source producing a fixed number of gradient frames, then EOF.
    struct CountingSource {
        remaining: u32,
        width: u32,
        height: u32,
    }

    #[async_trait]
    impl FrameSource for CountingSource {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        async fn read_frame(&mut self) -> MediaResult<Option<RgbFrame>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(RgbFrame::from_image(RgbImage::from_fn(
                self.width,
                self.height,
                |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0]),
            ))))
        }

        async fn close(&mut self) {}
    }

    struct NullDetector(DetectionClass);

    impl Detector for NullDetector {
        fn detect(&self, _frame: &RgbFrame) -> MediaResult<Vec<pblur_models::Detection>> {
            Ok(Vec::new())
        }

        fn class(&self) -> DetectionClass {
            self.0
        }

        fn name(&self) -> &'static str {
            "null"
        }
    }

    fn pump(config: RedactionConfig) -> StreamPump {
        let processor = Arc::new(FrameProcessor::new(
            Arc::new(NullDetector(DetectionClass::Face)),
            Arc::new(NullDetector(DetectionClass::IdDocument)),
            RedactionPolicy::new(config.clone()),
        ));
        StreamPump::new(processor, config)
    }

    fn source(frames: u32) -> Box<dyn FrameSource> {
        Box::new(CountingSource {
            remaining: frames,
            width: 64,
            height: 48,
        })
    }

    #[tokio::test]
    async fn test_stride_drops_intermediate_frames() {
        let mut config = TuningPreset::Fast.config();
        config.stride = 3;
        let p = pump(config);

        let (tx, mut rx) = mpsc::channel(16);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let outcome = p.run(source(9), tx, stop_rx).await;
        assert_eq!(outcome, PumpOutcome::SourceEnded);

        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        // 9 frames at stride 3: frames 3, 6, 9.
        assert_eq!(received, 3);
    }

    #[tokio::test]
    async fn test_emitted_frames_are_jpeg() {
        let mut config = TuningPreset::Fast.config();
        config.stride = 1;
        let p = pump(config);

        let (tx, mut rx) = mpsc::channel(16);
        let (_stop_tx, stop_rx) = watch::channel(false);
        p.run(source(1), tx, stop_rx).await;

        let jpeg = rx.recv().await.expect("one frame expected");
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_stop_request_ends_run() {
        let p = pump(TuningPreset::Fast.config());
        let (tx, _rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = watch::channel(false);
        stop_tx.send(true).unwrap();

        let outcome = p.run(source(1000), tx, stop_rx).await;
        assert_eq!(outcome, PumpOutcome::Stopped);
    }

    #[tokio::test]
    async fn test_dropped_receiver_ends_run() {
        let mut config = TuningPreset::Fast.config();
        config.stride = 1;
        let p = pump(config);

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let (_stop_tx, stop_rx) = watch::channel(false);

        let outcome = p.run(source(10), tx, stop_rx).await;
        assert_eq!(outcome, PumpOutcome::ClientDisconnected);
    }
}
