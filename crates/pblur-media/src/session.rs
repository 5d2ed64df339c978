//! Capture session lifecycle.
//!
//! [`SessionManager`] owns the single active capture slot. Starting a new
//! source implicitly stops the previous one, so at most one FFmpeg decode
//! subprocess and one pump task exist at any time.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use pblur_models::RedactionConfig;

use crate::error::MediaResult;
use crate::processor::FrameProcessor;
use crate::pump::{PumpOutcome, StreamPump};
use crate::source::SourceFactory;

/// Depth of the pump-to-transport frame channel. One in-flight frame keeps
/// the viewer current instead of buffering a stale backlog.
const FRAME_CHANNEL_DEPTH: usize = 1;

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
}

struct ActiveSession {
    url: String,
    stop: watch::Sender<bool>,
    task: JoinHandle<PumpOutcome>,
}

#[derive(Default)]
struct Inner {
    active: Option<ActiveSession>,
    frames: Option<mpsc::Receiver<Bytes>>,
}

/// Single-slot session manager shared by all HTTP handlers.
pub struct SessionManager {
    factory: Arc<dyn SourceFactory>,
    processor: Arc<FrameProcessor>,
    config: RedactionConfig,
    inner: Mutex<Inner>,
}

impl SessionManager {
    pub fn new(
        factory: Arc<dyn SourceFactory>,
        processor: Arc<FrameProcessor>,
        config: RedactionConfig,
    ) -> Self {
        Self {
            factory,
            processor,
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Switch the active session to a new source URL.
    ///
    /// Any previous session is stopped first. If the new source fails its
    /// readiness check the manager ends up Idle and the error is returned;
    /// the caller never observes a half-open session.
    pub async fn set_source(&self, url: &str) -> MediaResult<()> {
        let mut inner = self.inner.lock().await;
        Self::stop_active(&mut inner).await;

        let source = self.factory.open(url).await?;

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_DEPTH);
        let (stop_tx, stop_rx) = watch::channel(false);

        let pump = StreamPump::new(Arc::clone(&self.processor), self.config.clone());
        let task = tokio::spawn(async move { pump.run(source, frame_tx, stop_rx).await });

        info!(url, "Capture session started");
        inner.active = Some(ActiveSession {
            url: url.to_string(),
            stop: stop_tx,
            task,
        });
        inner.frames = Some(frame_rx);
        Ok(())
    }

    /// Stop the active session, if any. Returns whether one was running.
    pub async fn stop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        Self::stop_active(&mut inner).await
    }

    /// Take the frame stream for the active session.
    ///
    /// The stream is handed out once per session; a second viewer gets
    /// `None` until a new session starts.
    pub async fn take_stream(&self) -> Option<mpsc::Receiver<Bytes>> {
        self.inner.lock().await.frames.take()
    }

    /// Current state. A session whose pump task has already finished (EOF,
    /// viewer disconnect) reads as Idle.
    pub async fn state(&self) -> SessionState {
        let inner = self.inner.lock().await;
        match &inner.active {
            Some(active) if !active.task.is_finished() => SessionState::Streaming,
            _ => SessionState::Idle,
        }
    }

    /// URL of the currently streaming source, if any.
    pub async fn current_url(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .active
            .as_ref()
            .filter(|active| !active.task.is_finished())
            .map(|active| active.url.clone())
    }

    async fn stop_active(inner: &mut Inner) -> bool {
        inner.frames = None;
        let Some(active) = inner.active.take() else {
            return false;
        };
        let _ = active.stop.send(true);
        match active.task.await {
            Ok(outcome) => info!(url = %active.url, outcome = ?outcome, "Capture session stopped"),
            Err(e) => warn!(url = %active.url, error = %e, "Pump task failed"),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    use image::{Rgb, RgbImage};

    use pblur_models::{DetectionClass, TuningPreset};

    use crate::detect::Detector;
    use crate::error::{MediaError, MediaResult};
    use crate::frame::RgbFrame;
    use crate::redact::RedactionPolicy;
    use crate::source::FrameSource;

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

    /// Source producing frames until EOF, or forever when `remaining` is
    /// None.
    struct FakeSource {
        remaining: Option<u32>,
    }

    #[async_trait]
    impl FrameSource for FakeSource {
        fn width(&self) -> u32 {
            64
        }

        fn height(&self) -> u32 {
            48
        }

        async fn read_frame(&mut self) -> MediaResult<Option<RgbFrame>> {
            match &mut self.remaining {
                Some(0) => return Ok(None),
                Some(n) => *n -= 1,
                None => {}
            }
            // Yield so an endless source cannot starve the stop signal.
            tokio::task::yield_now().await;
            Ok(Some(RgbFrame::from_image(RgbImage::from_pixel(
                64,
                48,
                Rgb([128, 64, 32]),
            ))))
        }

        async fn close(&mut self) {}
    }

    /// Factory that fails for URLs containing "bad" and otherwise opens an
    /// endless fake source.
    struct FakeFactory {
        opened: StdMutex<Vec<String>>,
    }

    impl FakeFactory {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                opened: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SourceFactory for FakeFactory {
        async fn open(&self, url: &str) -> MediaResult<Box<dyn FrameSource>> {
            if url.contains("bad") {
                return Err(MediaError::source_unavailable(format!(
                    "Cannot connect to camera: {url}"
                )));
            }
            self.opened.lock().unwrap().push(url.to_string());
            Ok(Box::new(FakeSource { remaining: None }))
        }
    }

    fn manager(factory: Arc<FakeFactory>) -> SessionManager {
        let config = TuningPreset::Fast.config();
        let processor = Arc::new(FrameProcessor::new(
            Arc::new(NullDetector(DetectionClass::Face)),
            Arc::new(NullDetector(DetectionClass::IdDocument)),
            RedactionPolicy::new(config.clone()),
        ));
        SessionManager::new(factory, processor, config)
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let m = manager(FakeFactory::new());
        assert_eq!(m.state().await, SessionState::Idle);
        assert_eq!(m.current_url().await, None);
        assert!(!m.stop().await);
    }

    #[tokio::test]
    async fn test_unreachable_source_stays_idle() {
        let m = manager(FakeFactory::new());
        let err = m.set_source("rtsp://bad-host/stream").await.unwrap_err();
        assert!(matches!(err, MediaError::SourceUnavailable { .. }));
        assert_eq!(m.state().await, SessionState::Idle);
        assert!(m.take_stream().await.is_none());
    }

    #[tokio::test]
    async fn test_streaming_session_produces_frames() {
        let m = manager(FakeFactory::new());
        m.set_source("rtsp://camera/stream").await.unwrap();
        assert_eq!(m.state().await, SessionState::Streaming);
        assert_eq!(
            m.current_url().await.as_deref(),
            Some("rtsp://camera/stream")
        );

        let mut frames = m.take_stream().await.expect("stream available");
        let jpeg = frames.recv().await.expect("frame expected");
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        // The stream is handed out once per session.
        assert!(m.take_stream().await.is_none());
        m.stop().await;
    }

    #[tokio::test]
    async fn test_stop_returns_to_idle_and_closes_stream() {
        let m = manager(FakeFactory::new());
        m.set_source("rtsp://camera/stream").await.unwrap();
        let mut frames = m.take_stream().await.expect("stream available");

        assert!(m.stop().await);
        assert_eq!(m.state().await, SessionState::Idle);

        // Sender side is gone; the stream drains and closes.
        while frames.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn test_new_source_replaces_previous_session() {
        let factory = FakeFactory::new();
        let m = manager(Arc::clone(&factory));
        m.set_source("rtsp://camera/one").await.unwrap();
        m.set_source("rtsp://camera/two").await.unwrap();

        assert_eq!(m.state().await, SessionState::Streaming);
        assert_eq!(m.current_url().await.as_deref(), Some("rtsp://camera/two"));
        assert_eq!(
            *factory.opened.lock().unwrap(),
            vec!["rtsp://camera/one", "rtsp://camera/two"]
        );
        m.stop().await;
    }

    #[tokio::test]
    async fn test_failed_switch_stops_previous_session() {
        let m = manager(FakeFactory::new());
        m.set_source("rtsp://camera/one").await.unwrap();
        let err = m.set_source("rtsp://bad-host/stream").await.unwrap_err();
        assert!(matches!(err, MediaError::SourceUnavailable { .. }));
        assert_eq!(m.state().await, SessionState::Idle);
    }
}
