//! Storage error types.

use shadow_subtitle::SubtitleError;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while working with the local media library.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("No subtitle file found for {0}")]
    SubtitleNotFound(String),

    #[error("Subtitle index {index} out of range (0..{count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Malformed translations file {path}: {message}")]
    MalformedSidecar { path: String, message: String },

    #[error("Failed to persist {path}: {message}")]
    PersistFailed { path: String, message: String },

    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }
}
