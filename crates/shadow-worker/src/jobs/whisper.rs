//! Whisper job.

use serde_json::json;

use shadow_media::transcribe;
use shadow_queue::TaskProgress;

use crate::context::JobContext;
use crate::error::WorkerResult;
use crate::job::WhisperJob;

pub async fn run(ctx: &JobContext, job: WhisperJob, progress: TaskProgress) -> WorkerResult<serde_json::Value> {
    progress.update(0.0, "Generating subtitles");
    let outcome = transcribe(
        &job.request,
        &ctx.layout.temp_dir(),
        job.estimated_secs,
        progress.callback(),
    )
    .await?;

    Ok(json!({
        "output_path": ctx.layout.display_path(&outcome.output_path),
        "duration": outcome.duration,
        "model": outcome.model,
        "language": outcome.language,
    }))
}
