//! Video frame sources.
//!
//! [`FrameSource`] abstracts a live video input (IP camera URL, stream
//! endpoint, or anything else FFmpeg can open). The production
//! implementation probes the source with ffprobe as the readiness check,
//! then decodes raw RGB24 frames from an FFmpeg subprocess.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::frame::RgbFrame;

/// How long the readiness probe may take before the source is reported
/// unavailable.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A readable stream of decoded video frames.
#[async_trait]
pub trait FrameSource: Send {
    /// Native frame width in pixels.
    fn width(&self) -> u32;

    /// Native frame height in pixels.
    fn height(&self) -> u32;

    /// Pull the next raw frame.
    ///
    /// `Ok(None)` means the stream ended cleanly (disconnect / EOF); an
    /// error means the read itself failed. Either way the pump transitions
    /// to Idle.
    async fn read_frame(&mut self) -> MediaResult<Option<RgbFrame>>;

    /// Release the underlying capture resource. Implementations must make
    /// this safe to call once on every exit path; dropping the source must
    /// also release it.
    async fn close(&mut self);
}

/// Opens a [`FrameSource`] for a given URL. Abstracted so session tests can
/// inject scripted sources.
#[async_trait]
pub trait SourceFactory: Send + Sync {
    async fn open(&self, url: &str) -> MediaResult<Box<dyn FrameSource>>;
}

/// Production factory backed by FFmpeg.
pub struct FfmpegSourceFactory;

#[async_trait]
impl SourceFactory for FfmpegSourceFactory {
    async fn open(&self, url: &str) -> MediaResult<Box<dyn FrameSource>> {
        Ok(Box::new(FfmpegSource::open(url).await?))
    }
}

/// Frame source decoding a live stream through an FFmpeg subprocess.
///
/// FFmpeg writes packed RGB24 frames to stdout; one `read_exact` of
/// `width * height * 3` bytes yields one frame. The child is spawned with
/// `kill_on_drop`, so the capture handle is released exactly once no
/// matter how the pump exits.
pub struct FfmpegSource {
    child: Child,
    stdout: BufReader<ChildStdout>,
    width: u32,
    height: u32,
    closed: bool,
}

impl FfmpegSource {
    /// Probe the source for readiness and native dimensions, then start
    /// the decode subprocess.
    pub async fn open(url: &str) -> MediaResult<Self> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;
        which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

        let (width, height) = probe_stream(url).await?;
        info!(url, width, height, "Video source opened");

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i", url])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stdout not captured"))?;

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            width,
            height,
            closed: false,
        })
    }
}

#[async_trait]
impl FrameSource for FfmpegSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    async fn read_frame(&mut self) -> MediaResult<Option<RgbFrame>> {
        let mut buf = vec![0u8; RgbFrame::byte_len(self.width, self.height)];
        match self.stdout.read_exact(&mut buf).await {
            Ok(_) => Ok(Some(RgbFrame::new(self.width, self.height, buf)?)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!("Video source ended");
                Ok(None)
            }
            Err(e) => Err(MediaError::frame_read(e.to_string())),
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.child.start_kill() {
            warn!(error = %e, "Failed to kill FFmpeg decoder");
        }
        let _ = self.child.wait().await;
    }
}

/// FFprobe JSON output, video streams only.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a stream URL for its video dimensions.
///
/// This doubles as the readiness check: a source that ffprobe cannot open
/// within the timeout is `SourceUnavailable`.
async fn probe_stream(url: &str) -> MediaResult<(u32, u32)> {
    let probe = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
            "-select_streams",
            "v:0",
        ])
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output();

    let output = tokio::time::timeout(PROBE_TIMEOUT, probe)
        .await
        .map_err(|_| MediaError::source_unavailable(format!("Probe timed out: {url}")))??;

    if !output.status.success() {
        return Err(MediaError::source_unavailable(format!(
            "Cannot connect to camera: {url}"
        )));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    let stream = probe
        .streams
        .first()
        .ok_or_else(|| MediaError::source_unavailable("No video stream found"))?;

    match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(MediaError::source_unavailable(
            "Video stream reports no dimensions",
        )),
    }
}
