//! In-process task registry.
//!
//! Records live in memory only and are lost on restart. Every mutation goes
//! through [`TaskRecord`]'s transition methods, so terminal records stay
//! frozen no matter which job or reaper touches them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};

use shadow_models::{TaskId, TaskKind, TaskRecord, TaskStatus};

use crate::error::{QueueError, QueueResult};

const TASKS_TRACKED: &str = "shadow_tasks_tracked";

/// Shared handle to the task map. Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct TaskTracker {
    tasks: Arc<RwLock<HashMap<TaskId, TaskRecord>>>,
}

/// Outcome of one eviction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapStats {
    /// Terminal records removed after their TTL
    pub removed: usize,
    /// Running records failed for exceeding the maximum runtime
    pub expired: usize,
}

pub const MAX_RUNTIME_ERROR: &str = "Task exceeded maximum runtime";

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending task and return its record.
    pub fn create(&self, kind: TaskKind, message: impl Into<String>) -> TaskRecord {
        let record = TaskRecord::new(kind, message);
        let mut tasks = self.tasks.write();
        tasks.insert(record.task_id.clone(), record.clone());
        metrics::gauge!(TASKS_TRACKED).set(tasks.len() as f64);
        debug!(task_id = %record.task_id, kind = %kind, "Task registered");
        record
    }

    pub fn get(&self, id: &TaskId) -> Option<TaskRecord> {
        self.tasks.read().get(id).cloned()
    }

    /// Like [`get`](Self::get) but a missing task is an error.
    pub fn require(&self, id: &TaskId) -> QueueResult<TaskRecord> {
        self.get(id).ok_or_else(|| QueueError::task_not_found(id))
    }

    pub fn start(&self, id: &TaskId, message: impl Into<String>) -> bool {
        self.update(id, |r| r.start(message))
    }

    /// Record progress. Returns `false` when the task is unknown or finished.
    pub fn progress(&self, id: &TaskId, progress: f64, message: Option<String>) -> bool {
        self.update(id, |r| r.advance(progress, message))
    }

    pub fn complete(&self, id: &TaskId, result: serde_json::Value, message: impl Into<String>) -> bool {
        self.update(id, |r| r.complete(result, message))
    }

    pub fn fail(&self, id: &TaskId, error: impl Into<String>) -> bool {
        self.update(id, |r| r.fail(error))
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    /// Number of tasks in `status`.
    pub fn count_with_status(&self, status: TaskStatus) -> usize {
        self.tasks.read().values().filter(|r| r.status == status).count()
    }

    /// Drop terminal records idle for longer than `ttl_secs` and fail live
    /// ones created more than `max_runtime_secs` ago.
    pub fn reap(&self, now: DateTime<Utc>, ttl_secs: i64, max_runtime_secs: i64) -> ReapStats {
        let mut stats = ReapStats::default();
        let mut tasks = self.tasks.write();

        let before = tasks.len();
        tasks.retain(|_, r| !(r.status.is_terminal() && r.idle_secs(now) > ttl_secs));
        stats.removed = before - tasks.len();

        for record in tasks.values_mut() {
            if !record.status.is_terminal() && record.age_secs(now) > max_runtime_secs && record.fail(MAX_RUNTIME_ERROR) {
                warn!(
                    task_id = %record.task_id,
                    kind = %record.kind,
                    age_secs = record.age_secs(now),
                    "Task exceeded maximum runtime"
                );
                stats.expired += 1;
            }
        }

        metrics::gauge!(TASKS_TRACKED).set(tasks.len() as f64);

        stats
    }

    fn update<F>(&self, id: &TaskId, apply: F) -> bool
    where
        F: FnOnce(&mut TaskRecord) -> bool,
    {
        let mut tasks = self.tasks.write();
        match tasks.get_mut(id) {
            Some(record) => apply(record),
            None => {
                debug!(task_id = %id, "Update for unknown task ignored");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_lifecycle() {
        let tracker = TaskTracker::new();
        let record = tracker.create(TaskKind::Download, "Queued");
        let id = record.task_id.clone();

        assert_eq!(tracker.require(&id).unwrap().status, TaskStatus::Pending);
        assert!(tracker.start(&id, "Downloading"));
        assert!(tracker.progress(&id, 0.5, None));
        assert!(tracker.progress(&id, 0.3, Some("still going".into())));
        assert_eq!(tracker.get(&id).unwrap().progress, 0.5);

        assert!(tracker.complete(&id, json!({"video_path": "clips/a.mp4"}), "Done"));
        assert!(!tracker.fail(&id, "late"));

        let done = tracker.get(&id).unwrap();
        assert_eq!(done.status, TaskStatus::Success);
        assert_eq!(done.progress, 1.0);
        assert_eq!(done.result.unwrap()["video_path"], "clips/a.mp4");
    }

    #[test]
    fn test_unknown_task() {
        let tracker = TaskTracker::new();
        let id = TaskId::new();
        assert!(!tracker.progress(&id, 0.2, None));
        assert!(matches!(tracker.require(&id), Err(QueueError::TaskNotFound(_))));
    }

    #[test]
    fn test_reap_removes_old_terminal_records() {
        let tracker = TaskTracker::new();
        let done = tracker.create(TaskKind::Merge, "Queued").task_id;
        tracker.fail(&done, "boom");
        let live = tracker.create(TaskKind::Merge, "Queued").task_id;

        let stats = tracker.reap(Utc::now(), 3600, 7200);
        assert_eq!(stats, ReapStats::default());
        assert_eq!(tracker.len(), 2);

        let later = Utc::now() + Duration::seconds(3700);
        let stats = tracker.reap(later, 3600, 7200);
        assert_eq!(stats.removed, 1);
        assert!(tracker.get(&done).is_none());
        assert!(tracker.get(&live).is_some());
    }

    #[test]
    fn test_reap_fails_overdue_tasks() {
        let tracker = TaskTracker::new();
        let id = tracker.create(TaskKind::Repeat, "Queued").task_id;
        tracker.start(&id, "Rendering");

        let later = Utc::now() + Duration::seconds(7300);
        let stats = tracker.reap(later, 3600, 7200);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.removed, 0);

        let record = tracker.get(&id).unwrap();
        assert_eq!(record.status, TaskStatus::Failure);
        assert_eq!(record.error.as_deref(), Some(MAX_RUNTIME_ERROR));
        assert_eq!(tracker.count_with_status(TaskStatus::Failure), 1);
    }
}
