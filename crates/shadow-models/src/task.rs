//! Background task records polled by the frontend.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a background task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a new random task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Registered, waiting for an executor slot
    #[default]
    Pending,
    /// Job is running
    Processing,
    /// Finished with a result
    Success,
    /// Finished with an error
    Failure,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Success => "success",
            TaskStatus::Failure => "failure",
        }
    }

    /// Terminal states accept no further updates.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failure)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a task does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Download,
    Repeat,
    Merge,
    Whisper,
    FinalVideo,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Download => "download",
            TaskKind::Repeat => "repeat",
            TaskKind::Merge => "merge",
            TaskKind::Whisper => "whisper",
            TaskKind::FinalVideo => "final_video",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a background task.
///
/// Transitions are `pending -> processing -> success|failure` and
/// `pending -> failure`. Once terminal, every mutator is a no-op and returns
/// `false`. Progress only moves forward.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub kind: TaskKind,
    pub status: TaskStatus,
    /// Fraction complete in `[0.0, 1.0]`
    pub progress: f64,
    /// Human-readable step description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Kind-specific payload set on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Create a pending record.
    pub fn new(kind: TaskKind, message: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id: TaskId::new(),
            kind,
            status: TaskStatus::Pending,
            progress: 0.0,
            message: Some(message.into()),
            error: None,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move from pending to processing.
    pub fn start(&mut self, message: impl Into<String>) -> bool {
        if self.status != TaskStatus::Pending {
            return false;
        }
        self.status = TaskStatus::Processing;
        self.message = Some(message.into());
        self.touch();
        true
    }

    /// Record progress. Values are clamped to `[0, 1]` and never decrease.
    pub fn advance(&mut self, progress: f64, message: Option<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        let clamped = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        if clamped > self.progress {
            self.progress = clamped;
        }
        if message.is_some() {
            self.message = message;
        }
        self.touch();
        true
    }

    /// Finish successfully with a result payload.
    pub fn complete(&mut self, result: serde_json::Value, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Success;
        self.progress = 1.0;
        self.result = Some(result);
        self.message = Some(message.into());
        self.touch();
        true
    }

    /// Finish with an error. Progress is left where it stopped.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        let error = error.into();
        self.status = TaskStatus::Failure;
        self.message = Some(format!("Failed: {}", error));
        self.error = Some(error);
        self.touch();
        true
    }

    /// Seconds since the last update.
    pub fn idle_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.updated_at).num_seconds()
    }

    /// Seconds since creation.
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_seconds()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TaskStatus::Success).unwrap(), "\"success\"");
        assert_eq!(serde_json::to_string(&TaskKind::FinalVideo).unwrap(), "\"final_video\"");
        assert!(TaskStatus::Failure.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let mut record = TaskRecord::new(TaskKind::Repeat, "queued");
        record.start("running");
        record.advance(0.4, None);
        record.advance(0.2, Some("late update".into()));
        assert_eq!(record.progress, 0.4);
        assert_eq!(record.message.as_deref(), Some("late update"));
        record.advance(7.0, None);
        assert_eq!(record.progress, 1.0);
        record.advance(f64::NAN, None);
        assert_eq!(record.progress, 1.0);
    }

    #[test]
    fn test_terminal_records_are_frozen() {
        let mut record = TaskRecord::new(TaskKind::Merge, "queued");
        assert!(record.start("running"));
        assert!(record.complete(json!({"clips_count": 2}), "done"));
        assert_eq!(record.progress, 1.0);

        assert!(!record.fail("too late"));
        assert!(!record.advance(0.1, Some("ignored".into())));
        assert!(!record.start("again"));
        assert_eq!(record.status, TaskStatus::Success);
        assert!(record.error.is_none());
        assert_eq!(record.message.as_deref(), Some("done"));
    }

    #[test]
    fn test_pending_can_fail_directly() {
        let mut record = TaskRecord::new(TaskKind::Download, "queued");
        assert!(record.fail("yt-dlp not found"));
        assert_eq!(record.status, TaskStatus::Failure);
        assert_eq!(record.error.as_deref(), Some("yt-dlp not found"));
        assert!(!record.start("running"));
    }

    #[test]
    fn test_record_json_shape() {
        let record = TaskRecord::new(TaskKind::Whisper, "queued");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["kind"], "whisper");
        assert!(value.get("error").is_none());
        assert!(value["task_id"].as_str().unwrap().len() == 36);
    }
}
