//! Repeat video job.

use serde_json::json;

use shadow_media::RepeatVideoGenerator;
use shadow_queue::TaskProgress;

use crate::context::JobContext;
use crate::error::WorkerResult;
use crate::job::RepeatJob;

pub async fn run(ctx: &JobContext, job: RepeatJob, progress: TaskProgress) -> WorkerResult<serde_json::Value> {
    let generator = RepeatVideoGenerator::new(ctx.runner.clone(), ctx.layout.temp_dir())
        .with_synthesizer(ctx.synthesizer.clone());

    let outcome = generator.generate(&job.request, progress.callback()).await?;

    let output_name = outcome
        .output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(json!({
        "output_path": ctx.layout.display_path(&outcome.output_path),
        "output_name": output_name,
        "repeat_count": outcome.repeat_count,
        "duration": outcome.duration,
        "segments": outcome.segments,
    }))
}
