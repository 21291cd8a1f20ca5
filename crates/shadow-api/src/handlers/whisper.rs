//! Whisper subtitle generation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use shadow_media::{check_whisper, estimate_transcription, WhisperRequest};
use shadow_models::{WhisperEstimate, WhisperModel};
use shadow_worker::{WhisperJob, WorkerJob};

use crate::error::{ApiError, ApiResult};
use crate::handlers::tasks::TaskAccepted;
use crate::state::AppState;

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Deserialize)]
pub struct WhisperEstimateRequest {
    pub video_path: String,
    #[serde(default)]
    pub model: WhisperModel,
}

#[derive(Debug, Serialize)]
pub struct WhisperEstimateResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub estimate: WhisperEstimate,
}

pub async fn estimate_whisper(
    State(state): State<AppState>,
    Json(request): Json<WhisperEstimateRequest>,
) -> ApiResult<Json<WhisperEstimateResponse>> {
    let video = state.layout.require_file(&request.video_path)?;
    let estimate = estimate_transcription(&video, request.model).await?;
    Ok(Json(WhisperEstimateResponse {
        status: "success",
        estimate,
    }))
}

#[derive(Debug, Deserialize)]
pub struct WhisperGenerateRequest {
    pub video_path: String,
    #[serde(default)]
    pub model: WhisperModel,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Queue a transcription writing `<stem>.<language>.srt` next to the video.
pub async fn generate_whisper(
    State(state): State<AppState>,
    Json(request): Json<WhisperGenerateRequest>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    let video = state.layout.require_file(&request.video_path)?;
    let language = request.language.trim();
    if language.is_empty() || !language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ApiError::bad_request(format!("invalid language code '{}'", request.language)));
    }
    check_whisper()?;

    let estimate = estimate_transcription(&video, request.model).await?;
    let whisper_request = WhisperRequest::new(video, request.model, language);
    let subtitle_path = whisper_request.subtitle_path();
    let lock = state.locks.acquire(&subtitle_path)?;

    info!(
        video = %whisper_request.video.display(),
        model = request.model.as_str(),
        estimated_secs = estimate.estimated_seconds,
        "Whisper generation accepted"
    );

    let output_name = subtitle_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_path = state.layout.display_path(&subtitle_path);
    let job = WhisperJob {
        request: whisper_request,
        estimated_secs: estimate.estimated_seconds,
    };
    let record = state.executor.submit(WorkerJob::Whisper(job), Some(lock));

    Ok(TaskAccepted::new(record, "Subtitle generation started")
        .with_output(output_name, output_path)
        .with_estimate(estimate)
        .accepted())
}
