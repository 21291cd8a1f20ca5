//! Queue error types.

use std::path::PathBuf;

use thiserror::Error;

use shadow_models::TaskId;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Output is already being written by another job: {}", .0.display())]
    OutputBusy(PathBuf),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn task_not_found(id: &TaskId) -> Self {
        Self::TaskNotFound(id.clone())
    }
}
