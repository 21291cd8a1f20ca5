//! Merge job.

use serde_json::json;

use shadow_media::ClipMerger;
use shadow_queue::TaskProgress;

use crate::context::JobContext;
use crate::error::WorkerResult;
use crate::job::MergeJob;

pub async fn run(ctx: &JobContext, job: MergeJob, progress: TaskProgress) -> WorkerResult<serde_json::Value> {
    let merger = ClipMerger::new(ctx.runner.clone(), ctx.layout.temp_dir());
    let outcome = merger.merge(&job.clips, &job.output, progress.callback()).await?;

    Ok(json!({
        "output_path": ctx.layout.display_path(&outcome.output_path),
        "clips_count": outcome.clips_count,
        "duration": outcome.duration,
    }))
}
