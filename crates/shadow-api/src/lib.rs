//! Axum HTTP API for the shadowing clip studio.
//!
//! This crate provides:
//! - Download, subtitle, repeat, merge, whisper and thumbnail endpoints
//! - Task polling for background jobs
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
