//! Progress reporting bound to one task.

use std::sync::Arc;

use shadow_models::TaskId;

use crate::tracker::TaskTracker;

/// Closure form accepted by long-running media operations.
pub type ProgressFn = Arc<dyn Fn(f64, String) + Send + Sync + 'static>;

/// Writes progress for a single task into the tracker.
#[derive(Debug, Clone)]
pub struct TaskProgress {
    tracker: TaskTracker,
    task_id: TaskId,
}

impl TaskProgress {
    pub fn new(tracker: TaskTracker, task_id: TaskId) -> Self {
        Self { tracker, task_id }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn update(&self, progress: f64, message: impl Into<String>) {
        self.tracker.progress(&self.task_id, progress, Some(message.into()));
    }

    /// Progress without touching the message.
    pub fn set(&self, progress: f64) {
        self.tracker.progress(&self.task_id, progress, None);
    }

    /// Map an operation's `[0, 1]` onto `[from, to]` of the task.
    pub fn scaled(&self, from: f64, to: f64) -> ProgressFn {
        let this = self.clone();
        Arc::new(move |p: f64, message: String| {
            let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
            this.update(from + (to - from) * p, message);
        })
    }

    pub fn callback(&self) -> ProgressFn {
        self.scaled(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_models::TaskKind;

    #[test]
    fn test_scaled_callback() {
        let tracker = TaskTracker::new();
        let id = tracker.create(TaskKind::Repeat, "Queued").task_id;
        tracker.start(&id, "Rendering");

        let progress = TaskProgress::new(tracker.clone(), id.clone());
        let cb = progress.scaled(0.1, 0.9);
        cb(0.5, "Halfway".to_string());

        let record = tracker.get(&id).unwrap();
        assert!((record.progress - 0.5).abs() < 1e-9);
        assert_eq!(record.message.as_deref(), Some("Halfway"));

        cb(2.0, "Overshoot".to_string());
        assert!((tracker.get(&id).unwrap().progress - 0.9).abs() < 1e-9);
    }
}
