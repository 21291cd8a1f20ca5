//! Job executor.
//!
//! Jobs are spawned onto the tokio runtime as soon as they are submitted and
//! wait on a semaphore for one of `max_concurrent_jobs` slots. Their task
//! record stays `pending` until the slot is granted.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::Instrument;

use shadow_models::{TaskId, TaskRecord};
use shadow_queue::{OutputGuard, TaskProgress, TaskTracker};

use crate::context::JobContext;
use crate::job::WorkerJob;
use crate::logging::JobLogger;

pub const JOBS_ENQUEUED_TOTAL: &str = "shadow_jobs_enqueued_total";
pub const JOBS_COMPLETED_TOTAL: &str = "shadow_jobs_completed_total";
pub const JOBS_FAILED_TOTAL: &str = "shadow_jobs_failed_total";
pub const JOB_DURATION_SECONDS: &str = "shadow_job_duration_seconds";

/// Bounded runner for background jobs.
#[derive(Clone)]
pub struct JobExecutor {
    ctx: Arc<JobContext>,
    job_semaphore: Arc<Semaphore>,
}

impl JobExecutor {
    pub fn new(ctx: JobContext) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(ctx.config.max_concurrent_jobs.max(1)));
        Self {
            ctx: Arc::new(ctx),
            job_semaphore,
        }
    }

    pub fn context(&self) -> &JobContext {
        &self.ctx
    }

    pub fn tracker(&self) -> &TaskTracker {
        &self.ctx.tracker
    }

    /// Free job slots right now.
    pub fn available_slots(&self) -> usize {
        self.job_semaphore.available_permits()
    }

    /// Register a task for `job` and start it in the background.
    ///
    /// `output_lock` is held until the job finishes.
    pub fn submit(&self, job: WorkerJob, output_lock: Option<OutputGuard>) -> TaskRecord {
        let kind = job.kind();
        let record = self.ctx.tracker.create(kind, job.queued_message());
        metrics::counter!(JOBS_ENQUEUED_TOTAL, "kind" => kind.as_str()).increment(1);

        let ctx = Arc::clone(&self.ctx);
        let semaphore = Arc::clone(&self.job_semaphore);
        let task_id = record.task_id.clone();

        tokio::spawn(async move {
            let _output_lock = output_lock;
            let permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    ctx.tracker.fail(&task_id, "Job executor is shut down");
                    return;
                }
            };
            let _permit = permit;
            Self::execute_job(ctx, task_id, job).await;
        });

        record
    }

    async fn execute_job(ctx: Arc<JobContext>, task_id: TaskId, job: WorkerJob) {
        let kind = job.kind();
        let logger = JobLogger::new(&task_id, kind);
        let span = logger.create_span();

        async move {
            ctx.tracker.start(&task_id, "Processing");
            logger.log_start(job.queued_message());
            let started = Instant::now();

            let progress = TaskProgress::new(ctx.tracker.clone(), task_id.clone());
            let result = job.run(&ctx, progress).await;
            let elapsed = started.elapsed().as_secs_f64();

            match result {
                Ok(value) => {
                    ctx.tracker.complete(&task_id, value, "Completed");
                    metrics::counter!(JOBS_COMPLETED_TOTAL, "kind" => kind.as_str()).increment(1);
                    metrics::histogram!(JOB_DURATION_SECONDS, "kind" => kind.as_str(), "outcome" => "success")
                        .record(elapsed);
                    logger.log_completion(&format!("finished in {:.1}s", elapsed));
                }
                Err(e) => {
                    let message = e.task_message();
                    ctx.tracker.fail(&task_id, message.clone());
                    metrics::counter!(JOBS_FAILED_TOTAL, "kind" => kind.as_str()).increment(1);
                    metrics::histogram!(JOB_DURATION_SECONDS, "kind" => kind.as_str(), "outcome" => "failure")
                        .record(elapsed);
                    logger.log_error(&message);
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use shadow_models::TaskStatus;
    use shadow_queue::OutputLocks;
    use shadow_storage::StorageLayout;

    use crate::config::WorkerConfig;
    use crate::job::MergeJob;

    fn executor(root: &std::path::Path, max_jobs: usize) -> JobExecutor {
        let config = WorkerConfig {
            max_concurrent_jobs: max_jobs,
            ..WorkerConfig::default()
        };
        let ctx = JobContext::new(config, StorageLayout::new(root), TaskTracker::new()).unwrap();
        JobExecutor::new(ctx)
    }

    async fn wait_terminal(tracker: &TaskTracker, id: &TaskId) -> TaskRecord {
        for _ in 0..200 {
            let record = tracker.get(id).unwrap();
            if record.status.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} never finished", id);
    }

    #[tokio::test]
    async fn test_failed_job_records_error_and_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(dir.path(), 1);
        let locks = OutputLocks::new();
        let output = dir.path().join("merged.mp4");
        let guard = locks.acquire(&output).unwrap();

        let missing = dir.path().join("missing.mp4");
        let record = executor.submit(
            WorkerJob::Merge(MergeJob {
                clips: vec![missing],
                output: output.clone(),
            }),
            Some(guard),
        );
        assert_eq!(record.status, TaskStatus::Pending);

        let done = wait_terminal(executor.tracker(), &record.task_id).await;
        assert_eq!(done.status, TaskStatus::Failure);
        assert!(done.error.unwrap().contains("missing.mp4"));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!locks.is_held(&output));
        assert_eq!(executor.available_slots(), 1);
    }

    #[tokio::test]
    async fn test_every_submitted_job_reaches_a_terminal_state() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(dir.path(), 2);

        let ids: Vec<TaskId> = (0..4)
            .map(|i| {
                executor
                    .submit(
                        WorkerJob::Merge(MergeJob {
                            clips: vec![],
                            output: PathBuf::from(format!("out{}.mp4", i)),
                        }),
                        None,
                    )
                    .task_id
            })
            .collect();

        for id in &ids {
            let record = wait_terminal(executor.tracker(), id).await;
            assert_eq!(record.status, TaskStatus::Failure);
            assert_eq!(record.error.as_deref(), Some("Invalid input: no clips to merge"));
        }
    }
}
