//! Clip merging.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Local;
use serde::Deserialize;
use tracing::info;

use shadow_media::merge_output_name;
use shadow_storage::StorageError;
use shadow_worker::{MergeJob, WorkerJob};

use crate::error::{ApiError, ApiResult};
use crate::handlers::tasks::TaskAccepted;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MergeClipsRequest {
    pub clip_paths: Vec<String>,
    #[serde(default)]
    pub output_filename: Option<String>,
}

/// Queue a concat-demuxer merge into the merged clips directory.
pub async fn merge_clips(
    State(state): State<AppState>,
    Json(request): Json<MergeClipsRequest>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    if request.clip_paths.is_empty() {
        return Err(ApiError::bad_request("clip_paths must not be empty"));
    }

    let mut clips = Vec::with_capacity(request.clip_paths.len());
    for raw in &request.clip_paths {
        let clip = state.layout.require_file(raw).map_err(|e| match e {
            StorageError::NotFound(_) => ApiError::not_found(format!("Clip not found: {}", raw)),
            other => ApiError::from(other),
        })?;
        clips.push(std::path::absolute(&clip).unwrap_or(clip));
    }

    let output_name = merge_output_name(request.output_filename.as_deref(), Local::now());
    let output = state.layout.merged_dir().join(&output_name);
    let lock = state.locks.acquire(&output)?;

    info!(clips = clips.len(), output = %output.display(), "Merge accepted");

    let output_path = state.layout.display_path(&output);
    let record = state
        .executor
        .submit(WorkerJob::Merge(MergeJob { clips, output }), Some(lock));

    Ok(TaskAccepted::new(record, "Merge started")
        .with_output(output_name, output_path)
        .accepted())
}
