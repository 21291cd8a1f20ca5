//! Background eviction of finished and runaway tasks.

use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::info;

use crate::tracker::{ReapStats, TaskTracker};

/// Reaper configuration.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// How long terminal records stay pollable
    pub ttl: Duration,
    /// Live tasks older than this are failed
    pub max_runtime: Duration,
    /// Time between passes
    pub interval: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_runtime: Duration::from_secs(7200),
            interval: Duration::from_secs(60),
        }
    }
}

impl ReaperConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            ttl: Duration::from_secs(
                std::env::var("TASK_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            max_runtime: Duration::from_secs(
                std::env::var("TASK_MAX_RUNTIME_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(7200),
            ),
            interval: Duration::from_secs(
                std::env::var("TASK_REAP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .filter(|s| *s > 0)
                    .unwrap_or(60),
            ),
        }
    }
}

/// Periodically evicts expired task records.
pub struct TaskReaper {
    tracker: TaskTracker,
    config: ReaperConfig,
}

impl TaskReaper {
    pub fn new(tracker: TaskTracker, config: ReaperConfig) -> Self {
        Self { tracker, config }
    }

    /// Run forever. Spawn this as a background task.
    pub async fn run(self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            ttl_secs = self.config.ttl.as_secs(),
            max_runtime_secs = self.config.max_runtime.as_secs(),
            "Starting task reaper"
        );

        let mut ticker = interval(self.config.interval);
        loop {
            ticker.tick().await;
            self.reap_once();
        }
    }

    /// Run a single pass.
    pub fn reap_once(&self) -> ReapStats {
        let stats = self.tracker.reap(
            Utc::now(),
            self.config.ttl.as_secs() as i64,
            self.config.max_runtime.as_secs() as i64,
        );
        if stats.removed > 0 || stats.expired > 0 {
            info!(
                removed = stats.removed,
                expired = stats.expired,
                remaining = self.tracker.len(),
                "Task reaper pass complete"
            );
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_models::{TaskKind, TaskStatus};

    #[test]
    fn test_zero_ttl_evicts_finished_tasks() {
        let tracker = TaskTracker::new();
        let id = tracker.create(TaskKind::Download, "Queued").task_id;
        tracker.fail(&id, "boom");
        let live = tracker.create(TaskKind::Download, "Queued").task_id;

        let reaper = TaskReaper::new(
            tracker.clone(),
            ReaperConfig {
                ttl: Duration::ZERO,
                ..ReaperConfig::default()
            },
        );
        std::thread::sleep(Duration::from_millis(1100));
        let stats = reaper.reap_once();

        assert_eq!(stats.removed, 1);
        assert_eq!(tracker.get(&live).unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn test_defaults() {
        let config = ReaperConfig::default();
        assert_eq!(config.ttl.as_secs(), 3600);
        assert_eq!(config.max_runtime.as_secs(), 7200);
        assert_eq!(config.interval.as_secs(), 60);
    }
}
