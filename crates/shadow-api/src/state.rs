//! Application state.

use std::sync::Arc;

use shadow_media::FfmpegRunner;
use shadow_queue::{OutputLocks, TaskTracker};
use shadow_storage::{StorageLayout, TranslationStore};
use shadow_worker::{JobContext, JobExecutor, WorkerConfig, WorkerResult};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub layout: StorageLayout,
    pub tracker: TaskTracker,
    pub executor: JobExecutor,
    pub locks: OutputLocks,
    pub translations: Arc<TranslationStore>,
}

impl AppState {
    /// Build the state; the job executor shares the tracker with the handlers.
    pub fn new(config: ApiConfig, worker_config: WorkerConfig) -> WorkerResult<Self> {
        let layout = StorageLayout::new(config.data_root.clone());
        let tracker = TaskTracker::new();
        let ctx = JobContext::new(worker_config, layout.clone(), tracker.clone())?;

        Ok(Self {
            config,
            layout,
            tracker,
            executor: JobExecutor::new(ctx),
            locks: OutputLocks::new(),
            translations: Arc::new(TranslationStore::new()),
        })
    }

    /// Runner for synchronous media work (thumbnails, on-demand Whisper).
    pub fn runner(&self) -> &FfmpegRunner {
        &self.executor.context().runner
    }
}
