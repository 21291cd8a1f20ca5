//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the Prometheus recorder and return the render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "shadow_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "shadow_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "shadow_http_requests_in_flight";

    // Synchronous media work done inside a request
    pub const THUMBNAILS_GENERATED_TOTAL: &str = "shadow_thumbnails_generated_total";
    pub const SUBTITLE_SEARCHES_TOTAL: &str = "shadow_subtitle_searches_total";
    pub const TRANSLATIONS_SAVED_TOTAL: &str = "shadow_translations_saved_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "shadow_rate_limit_hits_total";
}

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});

static STREAM_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/stream/.*$").unwrap());

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_thumbnail_generated(template: &str) {
    let labels = [("template", template.to_string())];
    counter!(names::THUMBNAILS_GENERATED_TOTAL, &labels).increment(1);
}

pub fn record_subtitle_search(multiline: bool) {
    let labels = [("multiline", multiline.to_string())];
    counter!(names::SUBTITLE_SEARCHES_TOTAL, &labels).increment(1);
}

pub fn record_translation_saved() {
    counter!(names::TRANSLATIONS_SAVED_TOTAL).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Collapse task ids and streamed file paths so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, ":id");
    STREAM_PATH.replace(&path, "/stream/:path").into_owned()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/youtube/repeat/status/550e8400-e29b-41d4-a716-446655440000"),
            "/api/youtube/repeat/status/:id"
        );
        assert_eq!(
            sanitize_path("/api/youtube/stream/clips_output/talk_repeat3.mp4"),
            "/api/youtube/stream/:path"
        );
        assert_eq!(sanitize_path("/api/youtube/clips"), "/api/youtube/clips");
    }
}
