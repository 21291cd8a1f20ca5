//! Structured job logging utilities.

use tracing::{error, info, warn, Span};

use shadow_models::{TaskId, TaskKind};

/// Lifecycle logging for one background task.
#[derive(Debug, Clone)]
pub struct JobLogger {
    task_id: String,
    kind: TaskKind,
}

impl JobLogger {
    pub fn new(task_id: &TaskId, kind: TaskKind) -> Self {
        Self {
            task_id: task_id.to_string(),
            kind,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(task_id = %self.task_id, kind = %self.kind, "Job started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(task_id = %self.task_id, kind = %self.kind, "Job progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(task_id = %self.task_id, kind = %self.kind, "Job warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(task_id = %self.task_id, kind = %self.kind, "Job error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(task_id = %self.task_id, kind = %self.kind, "Job completed: {}", message);
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Span carrying the task id and kind for everything the job logs.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", task_id = %self.task_id, kind = %self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let id = TaskId::new();
        let logger = JobLogger::new(&id, TaskKind::Merge);
        assert_eq!(logger.task_id(), id.to_string());
        assert_eq!(logger.kind(), TaskKind::Merge);
    }
}
