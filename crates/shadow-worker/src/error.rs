//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] shadow_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] shadow_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] shadow_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Text stored on a failed task record.
    ///
    /// Tool errors are passed through without the wrapper prefix so the
    /// exit status and stderr tail read as the tool reported them.
    pub fn task_message(&self) -> String {
        match self {
            WorkerError::JobFailed(msg) => msg.clone(),
            WorkerError::Media(e) => e.to_string(),
            WorkerError::Storage(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}
