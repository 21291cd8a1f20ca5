//! Job definitions.

use std::path::PathBuf;

use shadow_media::{FinalVideoRequest, RepeatRequest, WhisperRequest};
use shadow_models::TaskKind;

use crate::context::JobContext;
use crate::error::WorkerResult;
use crate::jobs;
use shadow_queue::TaskProgress;

/// yt-dlp download into `output_dir`.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub url: String,
    pub output_dir: PathBuf,
    pub format: Option<String>,
    /// Empty means the configured defaults
    pub subtitle_langs: Vec<String>,
}

/// Repeat video render.
#[derive(Debug, Clone)]
pub struct RepeatJob {
    pub request: RepeatRequest,
}

/// Concatenation of finished clips.
#[derive(Debug, Clone)]
pub struct MergeJob {
    pub clips: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Whisper transcription.
#[derive(Debug, Clone)]
pub struct WhisperJob {
    pub request: WhisperRequest,
    pub estimated_secs: f64,
}

/// Thumbnail intro + video.
#[derive(Debug, Clone)]
pub struct FinalVideoJob {
    pub request: FinalVideoRequest,
}

/// A unit of background work.
#[derive(Debug, Clone)]
pub enum WorkerJob {
    Download(DownloadJob),
    Repeat(RepeatJob),
    Merge(MergeJob),
    Whisper(WhisperJob),
    FinalVideo(FinalVideoJob),
}

impl WorkerJob {
    pub fn kind(&self) -> TaskKind {
        match self {
            WorkerJob::Download(_) => TaskKind::Download,
            WorkerJob::Repeat(_) => TaskKind::Repeat,
            WorkerJob::Merge(_) => TaskKind::Merge,
            WorkerJob::Whisper(_) => TaskKind::Whisper,
            WorkerJob::FinalVideo(_) => TaskKind::FinalVideo,
        }
    }

    /// Message shown while the task waits for a slot.
    pub fn queued_message(&self) -> &'static str {
        match self {
            WorkerJob::Download(_) => "Download queued",
            WorkerJob::Repeat(_) => "Repeat video generation queued",
            WorkerJob::Merge(_) => "Merge queued",
            WorkerJob::Whisper(_) => "Subtitle generation queued",
            WorkerJob::FinalVideo(_) => "Final video generation queued",
        }
    }

    /// Run the job and return the task result payload.
    pub async fn run(self, ctx: &JobContext, progress: TaskProgress) -> WorkerResult<serde_json::Value> {
        match self {
            WorkerJob::Download(job) => jobs::download::run(ctx, job, progress).await,
            WorkerJob::Repeat(job) => jobs::repeat::run(ctx, job, progress).await,
            WorkerJob::Merge(job) => jobs::merge::run(ctx, job, progress).await,
            WorkerJob::Whisper(job) => jobs::whisper::run(ctx, job, progress).await,
            WorkerJob::FinalVideo(job) => jobs::final_video::run(ctx, job, progress).await,
        }
    }
}
