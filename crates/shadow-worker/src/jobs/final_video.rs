//! Final video job.

use serde_json::json;

use shadow_media::generate_final_video;
use shadow_queue::TaskProgress;

use crate::context::JobContext;
use crate::error::WorkerResult;
use crate::job::FinalVideoJob;

pub async fn run(ctx: &JobContext, job: FinalVideoJob, progress: TaskProgress) -> WorkerResult<serde_json::Value> {
    let temp_dir = ctx.layout.temp_dir();
    let outcome = generate_final_video(&ctx.runner, &job.request, &temp_dir, progress.callback()).await?;

    let output_name = outcome
        .output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(json!({
        "output_path": ctx.layout.display_path(&outcome.output_path),
        "output_name": output_name,
        "duration": outcome.duration,
    }))
}
