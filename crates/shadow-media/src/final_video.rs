//! Thumbnail intro + video.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use shadow_models::{sanitize_file_stem, with_extension};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{normalize_audio, normalize_video, silent_audio_source};
use crate::fs_utils::{job_workspace, move_file};
use crate::probe::{get_duration, probe_video};
use crate::progress::StepCallback;

pub const FINAL_WIDTH: u32 = 1280;
pub const FINAL_HEIGHT: u32 = 720;
pub const FINAL_FPS: u32 = 30;
pub const DEFAULT_INTRO_SECS: f64 = 3.0;

/// `{stem}_final.mp4` unless a name was requested.
pub fn final_output_name(video: &Path, requested: Option<&str>) -> String {
    match requested.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => with_extension(&sanitize_file_stem(name), "mp4"),
        None => {
            let stem = video
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "video".to_string());
            format!("{}_final.mp4", stem)
        }
    }
}

#[derive(Debug, Clone)]
pub struct FinalVideoRequest {
    pub video: PathBuf,
    pub thumbnail: PathBuf,
    pub intro_secs: f64,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalVideoOutcome {
    pub output_path: PathBuf,
    pub duration: f64,
}

/// Filter graph joining the intro (inputs 0 and 1) with the video (input 2).
///
/// `video_audio` is the label of the main part's audio stream.
pub fn final_filter(video_audio: &str) -> String {
    [
        normalize_video("0:v", FINAL_WIDTH, FINAL_HEIGHT, FINAL_FPS, "v0"),
        normalize_audio("1:a", "a0"),
        normalize_video("2:v", FINAL_WIDTH, FINAL_HEIGHT, FINAL_FPS, "v1"),
        normalize_audio(video_audio, "a1"),
        "[v0][a0][v1][a1]concat=n=2:v=1:a=1[outv][outa]".to_string(),
    ]
    .join(";")
}

/// Build the single ffmpeg invocation for the final video.
///
/// A video without audio gets a silent track of `video_secs`.
pub fn final_command(request: &FinalVideoRequest, has_audio: bool, video_secs: f64, output: &Path) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(&request.thumbnail, output)
        .loop_input()
        .duration(request.intro_secs)
        .add_lavfi(silent_audio_source())
        .duration(request.intro_secs)
        .add_input(&request.video);

    let video_audio = if has_audio {
        "2:a"
    } else {
        cmd = cmd.add_lavfi(silent_audio_source()).duration(video_secs);
        "3:a"
    };

    cmd.filter_complex(final_filter(video_audio))
        .map("[outv]")
        .map("[outa]")
        .video_codec("libx264")
        .preset("fast")
        .pixel_format("yuv420p")
        .audio_codec("aac")
        .audio_bitrate("192k")
}

/// Render the final video into `request.output`.
pub async fn generate_final_video(
    runner: &FfmpegRunner,
    request: &FinalVideoRequest,
    workspace_root: &Path,
    on_progress: StepCallback,
) -> MediaResult<FinalVideoOutcome> {
    for input in [&request.video, &request.thumbnail] {
        if !input.is_file() {
            return Err(MediaError::FileNotFound(input.clone()));
        }
    }
    if request.intro_secs.is_nan() || request.intro_secs <= 0.0 {
        return Err(MediaError::invalid_input("thumbnail duration must be positive"));
    }

    let info = probe_video(&request.video).await?;
    on_progress(0.05, "Preparing final video".to_string());

    let workspace = job_workspace(workspace_root, "final-")?;
    let staged = workspace.path().join("final.mp4");
    let cmd = final_command(request, info.has_audio, info.duration, &staged);

    let total_ms = ((request.intro_secs + info.duration) * 1000.0) as i64;
    let callback = Arc::clone(&on_progress);
    runner
        .clone()
        .operation("final_video")
        .run_with_progress(&cmd, move |p| {
            callback(0.05 + 0.9 * p.fraction(total_ms), "Rendering final video".to_string());
        })
        .await?;

    let duration = get_duration(&staged)
        .await
        .unwrap_or(request.intro_secs + info.duration);
    move_file(&staged, &request.output).await?;

    info!(output = %request.output.display(), duration, "Final video generated");
    Ok(FinalVideoOutcome {
        output_path: request.output.clone(),
        duration,
    })
}
