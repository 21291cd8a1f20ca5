//! Thumbnails and thumbnail-intro final videos.

use std::path::Path;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use shadow_media::{
    default_thumbnail_name, final_output_name, generate_thumbnail, FinalVideoRequest, ThumbnailRequest,
    ThumbnailTemplate, DEFAULT_INTRO_SECS,
};
use shadow_models::{sanitize_file_stem, with_extension, Timestamp};
use shadow_worker::{FinalVideoJob, WorkerJob};

use crate::error::{ApiError, ApiResult};
use crate::handlers::tasks::TaskAccepted;
use crate::metrics;
use crate::security::sanitize_text;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateThumbnailRequest {
    pub video_path: String,
    /// Frame position, e.g. `00:01:05`
    pub time_pos: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub output_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateThumbnailResponse {
    pub status: &'static str,
    pub message: String,
    pub output_path: String,
    pub output_name: String,
    pub template: ThumbnailTemplate,
}

/// Caller-chosen names keep a `.jpg`/`.png` extension, otherwise `.jpg` is added.
pub fn thumbnail_output_name(video: &Path, time: Timestamp, requested: Option<&str>) -> String {
    match requested.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            let name = sanitize_file_stem(name);
            if name.to_ascii_lowercase().ends_with(".png") {
                name
            } else {
                with_extension(&name, "jpg")
            }
        }
        None => default_thumbnail_name(video, time),
    }
}

/// Render a thumbnail synchronously into `clips/thumbnails`.
pub async fn create_thumbnail(
    State(state): State<AppState>,
    Json(request): Json<GenerateThumbnailRequest>,
) -> ApiResult<Json<GenerateThumbnailResponse>> {
    let video = state.layout.require_file(&request.video_path)?;
    let time: Timestamp = request
        .time_pos
        .parse()
        .map_err(|e| ApiError::bad_request(format!("invalid time_pos '{}': {}", request.time_pos, e)))?;
    let template = match request.template.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(name) => name.parse::<ThumbnailTemplate>().map_err(ApiError::bad_request)?,
        None => ThumbnailTemplate::default(),
    };

    let output_name = thumbnail_output_name(&video, time, request.output_name.as_deref());
    let output = state.layout.thumbnails_dir().join(&output_name);
    let _lock = state.locks.acquire(&output)?;

    let text = |t: &Option<String>| t.as_deref().map(sanitize_text).filter(|t| !t.trim().is_empty());
    let thumbnail = ThumbnailRequest {
        video,
        time,
        output,
        text: text(&request.text),
        subtitle: text(&request.subtitle),
        template,
    };

    let path = generate_thumbnail(state.runner(), &thumbnail, &state.layout.temp_dir()).await?;
    metrics::record_thumbnail_generated(template.as_str());
    info!(output = %path.display(), template = template.as_str(), "Thumbnail generated");

    Ok(Json(GenerateThumbnailResponse {
        status: "success",
        message: "Thumbnail generated".to_string(),
        output_path: state.layout.display_path(&path),
        output_name,
        template,
    }))
}

fn default_intro_secs() -> f64 {
    DEFAULT_INTRO_SECS
}

#[derive(Debug, Deserialize)]
pub struct GenerateFinalRequest {
    pub video_path: String,
    pub thumbnail_path: String,
    #[serde(default = "default_intro_secs")]
    pub thumbnail_duration: f64,
    #[serde(default)]
    pub output_name: Option<String>,
}

/// Queue the thumbnail-intro render into the output directory.
pub async fn generate_final(
    State(state): State<AppState>,
    Json(request): Json<GenerateFinalRequest>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    if !request.thumbnail_duration.is_finite() || request.thumbnail_duration <= 0.0 || request.thumbnail_duration > 60.0 {
        return Err(ApiError::bad_request("thumbnail_duration must be between 0 and 60 seconds"));
    }
    let video = state.layout.require_file(&request.video_path)?;
    let thumbnail = resolve_thumbnail(&state, &request.thumbnail_path)?;

    let output_name = final_output_name(&video, request.output_name.as_deref());
    let output = state.layout.output_dir().join(&output_name);
    let lock = state.locks.acquire(&output)?;

    info!(
        video = %video.display(),
        thumbnail = %thumbnail.display(),
        intro_secs = request.thumbnail_duration,
        output = %output.display(),
        "Final video accepted"
    );

    let output_path = state.layout.display_path(&output);
    let job = FinalVideoJob {
        request: FinalVideoRequest {
            video,
            thumbnail,
            intro_secs: request.thumbnail_duration,
            output,
        },
    };
    let record = state.executor.submit(WorkerJob::FinalVideo(job), Some(lock));

    Ok(TaskAccepted::new(record, "Final video generation started")
        .with_output(output_name, output_path)
        .accepted())
}

/// Thumbnails are usually referenced by bare name from `clips/thumbnails`.
fn resolve_thumbnail(state: &AppState, raw: &str) -> ApiResult<std::path::PathBuf> {
    let by_name = Path::new(raw.trim())
        .file_name()
        .map(|name| state.layout.thumbnails_dir().join(name));
    match by_name {
        Some(path) if path.is_file() && !raw.contains("..") => Ok(path),
        _ => Ok(state.layout.require_file(raw)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_output_name() {
        let video = Path::new("clips/talk.mp4");
        let time = Timestamp::from_secs_f64(65.0);
        assert_eq!(
            thumbnail_output_name(video, time, None),
            default_thumbnail_name(video, time)
        );
        assert_eq!(thumbnail_output_name(video, time, Some("cover")), "cover.jpg");
        assert_eq!(thumbnail_output_name(video, time, Some("cover.PNG")), "cover.PNG");
        assert_eq!(thumbnail_output_name(video, time, Some("../x.jpg")), "_x.jpg");
    }
}
