//! Shared state handed to every job.

use std::sync::Arc;

use tracing::info;

use shadow_media::{EdgeTtsCli, FfmpegRunner, HttpSpeechSynthesizer, SpeechSynthesizer};
use shadow_queue::TaskTracker;
use shadow_storage::StorageLayout;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Everything a job needs besides its own input.
pub struct JobContext {
    pub config: WorkerConfig,
    pub layout: StorageLayout,
    pub tracker: TaskTracker,
    pub runner: FfmpegRunner,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl JobContext {
    pub fn new(config: WorkerConfig, layout: StorageLayout, tracker: TaskTracker) -> WorkerResult<Self> {
        let runner = FfmpegRunner::new().with_timeout_opt(config.ffmpeg_timeout_secs);

        let synthesizer: Arc<dyn SpeechSynthesizer> = match &config.tts_service_url {
            Some(url) => Arc::new(
                HttpSpeechSynthesizer::new(url.clone(), config.tts_timeout)
                    .map_err(|e| WorkerError::config_error(e.to_string()))?,
            ),
            None => Arc::new(EdgeTtsCli),
        };
        info!(
            tts_backend = synthesizer.name(),
            ffmpeg_timeout_secs = ?config.ffmpeg_timeout_secs,
            "Job context ready"
        );

        Ok(Self {
            config,
            layout,
            tracker,
            runner,
            synthesizer,
        })
    }
}
