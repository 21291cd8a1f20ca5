//! Clip library: downloads, listing and streaming.

use std::path::PathBuf;

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::info;

use shadow_models::VideoClip;
use shadow_storage::list_clips;
use shadow_worker::{DownloadJob, WorkerJob};

use crate::error::{ApiError, ApiResult};
use crate::handlers::tasks::TaskAccepted;
use crate::security::validate_video_url;
use crate::state::AppState;

/// Request to download a video with yt-dlp.
#[derive(Debug, Deserialize)]
pub struct DownloadVideoRequest {
    pub url: String,
    /// Target directory; the clips directory when absent
    #[serde(default)]
    pub output_dir: Option<String>,
    /// yt-dlp format selector
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub subtitle_languages: Option<Vec<String>>,
}

/// Start a background download.
pub async fn download_video(
    State(state): State<AppState>,
    Json(request): Json<DownloadVideoRequest>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    let url = validate_video_url(&request.url)
        .into_result()
        .map_err(ApiError::bad_request)?;

    let output_dir = resolve_output_dir(&state, request.output_dir.as_deref())?;
    tokio::fs::create_dir_all(&output_dir)
        .await
        .map_err(|e| ApiError::internal(format!("cannot create {}: {}", output_dir.display(), e)))?;

    let job = DownloadJob {
        url: url.clone(),
        output_dir: output_dir.clone(),
        format: request.format,
        subtitle_langs: request.subtitle_languages.unwrap_or_default(),
    };
    let record = state.executor.submit(WorkerJob::Download(job), None);

    info!(task_id = %record.task_id, url = %url, output_dir = %output_dir.display(), "Download accepted");
    Ok(TaskAccepted::new(record, "Download started. Poll the task for progress.").accepted())
}

fn resolve_output_dir(state: &AppState, requested: Option<&str>) -> ApiResult<PathBuf> {
    match requested.map(str::trim).filter(|d| !d.is_empty()) {
        None => Ok(state.layout.clips_dir()),
        Some(dir) if dir.split(['/', '\\']).any(|c| c == "..") => {
            Err(ApiError::bad_request("output_dir must not contain '..'"))
        }
        Some(dir) => Ok(state.layout.standardize_path(dir)),
    }
}

/// Videos in the clips directory, newest first.
pub async fn list_videos(State(state): State<AppState>) -> ApiResult<Json<Vec<VideoClip>>> {
    let clips = list_clips(&state.layout).await?;
    Ok(Json(clips))
}

/// Serve a video with HTTP range support.
pub async fn stream_video(
    State(state): State<AppState>,
    Path(file_path): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    let path = state.layout.resolve_stream_path(file_path.trim_start_matches('/'))?;

    let response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});

    Ok(response.map(Body::new))
}
