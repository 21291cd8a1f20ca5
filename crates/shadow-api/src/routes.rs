//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::clips::{download_video, list_videos, stream_video};
use crate::handlers::merge::merge_clips;
use crate::handlers::repeat::{estimate_generation, generate_repeat};
use crate::handlers::subtitles::{get_subtitles, search_subtitles, translate_subtitle};
use crate::handlers::tasks::{download_status, final_status, get_task, merge_status, repeat_status, whisper_status};
use crate::handlers::thumbnail::{create_thumbnail, generate_final};
use crate::handlers::whisper::{estimate_whisper, generate_whisper};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, rate_limit_middleware, request_id, request_logging, security_headers, RateLimiterCache};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let youtube_routes = Router::new()
        // Library
        .route("/youtube/download", post(download_video))
        .route("/youtube/download/status/:task_id", get(download_status))
        .route("/youtube/clips", get(list_videos))
        .route("/youtube/stream/*file_path", get(stream_video))
        // Subtitles
        .route("/youtube/subtitle/get", get(get_subtitles))
        .route("/youtube/subtitle/search", post(search_subtitles))
        .route("/subtitle/translate", post(translate_subtitle))
        // Repeat videos
        .route("/youtube/generate-repeat", post(generate_repeat))
        .route("/youtube/repeat/status/:task_id", get(repeat_status))
        .route("/youtube/estimate-generation", post(estimate_generation))
        // Merging
        .route("/youtube/merge-clips", post(merge_clips))
        .route("/youtube/merge/status/:task_id", get(merge_status))
        // Whisper
        .route("/youtube/whisper/estimate", post(estimate_whisper))
        .route("/youtube/whisper/generate", post(generate_whisper))
        .route("/youtube/whisper/status/:task_id", get(whisper_status))
        // Thumbnails and final videos
        .route("/youtube/generate-thumbnail", post(create_thumbnail))
        .route("/youtube/generate-final", post(generate_final))
        .route("/youtube/final/status/:task_id", get(final_status));

    let task_routes = Router::new().route("/tasks/:task_id", get(get_task));

    let rate_limiter = Arc::new(RateLimiterCache::new(
        state.config.rate_limit_rps,
        state.config.rate_limit_burst,
    ));

    let api_routes = Router::new()
        .merge(youtube_routes)
        .merge(task_routes)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
