//! API error types.
//!
//! Every error renders as `{"status": "error", "detail": ..., "code": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use shadow_media::MediaError;
use shadow_queue::QueueError;
use shadow_storage::StorageError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn validation(msg: impl std::fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(e) => match e {
                StorageError::NotFound(_) | StorageError::SubtitleNotFound(_) => StatusCode::NOT_FOUND,
                StorageError::InvalidPath(_)
                | StorageError::UnsupportedFormat(_)
                | StorageError::IndexOutOfRange { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Media(e) if e.is_missing_tool() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Media(e) => match e {
                MediaError::FileNotFound(_) => StatusCode::NOT_FOUND,
                MediaError::InvalidInput(_) | MediaError::InvalidVideo(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Queue(e) => match e {
                QueueError::TaskNotFound(_) => StatusCode::NOT_FOUND,
                QueueError::OutputBusy(_) => StatusCode::CONFLICT,
                QueueError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self.status_code() {
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::CONFLICT => "conflict",
            StatusCode::TOO_MANY_REQUESTS => "rate_limited",
            StatusCode::SERVICE_UNAVAILABLE => "tool_unavailable",
            StatusCode::BAD_REQUEST if matches!(self, ApiError::Validation(_)) => "validation_error",
            StatusCode::BAD_REQUEST => "bad_request",
            _ => "internal_error",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    detail: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = ErrorResponse {
            status: "error",
            detail,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use shadow_models::TaskId;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(StorageError::not_found("a.mp4")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StorageError::IndexOutOfRange { index: 9, count: 3 }).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(QueueError::OutputBusy(PathBuf::from("out.mp4"))).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(QueueError::task_not_found(&TaskId::new())).code(),
            "not_found"
        );
        assert_eq!(
            ApiError::from(MediaError::YtDlpNotFound).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ApiError::validation("repeat_count").code(), "validation_error");
    }

    #[test]
    fn test_detail_is_inner_message() {
        let err = ApiError::from(StorageError::not_found("clips/a.mp4"));
        assert_eq!(err.to_string(), "File not found: clips/a.mp4");
    }
}
