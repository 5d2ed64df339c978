//! Request handlers.

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use bytes::{BufMut, Bytes, BytesMut};
use chrono::Utc;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use pblur_media::SessionState;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::ui;

/// MJPEG part boundary. Must match the boundary parameter advertised in
/// the `Content-Type` header.
const FRAME_BOUNDARY: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";

/// Serve the browser control page.
pub async fn index() -> Html<&'static str> {
    Html(ui::CONTROL_PAGE)
}

#[derive(Debug, Deserialize)]
pub struct SetCameraRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}

/// Point the pipeline at a new camera URL.
///
/// Any previous session is stopped first; a source that fails its
/// readiness check leaves the pipeline idle and returns 400.
pub async fn set_camera(
    State(state): State<AppState>,
    Json(request): Json<SetCameraRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(ApiError::bad_request("No URL provided"));
    }

    state.sessions.set_source(url).await?;
    info!(url, "Camera URL set");
    Ok(Json(StatusResponse::success()))
}

/// Stop the active session. Succeeds even when nothing is streaming.
pub async fn stop_camera(State(state): State<AppState>) -> Json<StatusResponse> {
    let was_streaming = state.sessions.stop().await;
    info!(was_streaming, "Camera stopped");
    Json(StatusResponse::success())
}

/// The live MJPEG stream.
///
/// Frames arrive as `multipart/x-mixed-replace` parts; browsers render
/// each JPEG as it lands, replacing the previous one. The response ends
/// when the session stops or the source disconnects.
pub async fn video_feed(State(state): State<AppState>) -> ApiResult<Response> {
    let frames = state
        .sessions
        .take_stream()
        .await
        .ok_or_else(|| ApiError::conflict("No active camera session"))?;

    let stream = ReceiverStream::new(frames)
        .map(|jpeg| Ok::<Bytes, Infallible>(mjpeg_part(&jpeg)));

    Response::builder()
        .header(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=frame",
        )
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// Wrap one JPEG frame as an MJPEG multipart chunk.
fn mjpeg_part(jpeg: &Bytes) -> Bytes {
    let mut chunk = BytesMut::with_capacity(FRAME_BOUNDARY.len() + jpeg.len() + 2);
    chunk.put_slice(FRAME_BOUNDARY);
    chunk.put_slice(jpeg);
    chunk.put_slice(b"\r\n");
    chunk.freeze()
}

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub session: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let session = match state.sessions.state().await {
        SessionState::Streaming => "streaming",
        SessionState::Idle => "idle",
    };
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        session: session.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
