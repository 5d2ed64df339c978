//! Axum HTTP server for the privacy blur stream.
//!
//! This crate provides:
//! - The browser control page and MJPEG stream endpoint
//! - Camera session start/stop endpoints
//! - Health check

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod ui;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
