//! Whisper speech-to-text subtitles.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info};

use shadow_models::{WhisperEstimate, WhisperModel};

use crate::command::check_whisper;
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{job_workspace, move_file};
use crate::probe::get_duration;
use crate::progress::StepCallback;

/// Upper bound for time-based progress while whisper is still running.
const PROGRESS_CEILING: f64 = 0.95;

#[derive(Debug, Clone)]
pub struct WhisperRequest {
    pub video: PathBuf,
    pub model: WhisperModel,
    pub language: String,
}

impl WhisperRequest {
    pub fn new(video: impl Into<PathBuf>, model: WhisperModel, language: impl Into<String>) -> Self {
        Self {
            video: video.into(),
            model,
            language: language.into(),
        }
    }

    fn video_dir(&self) -> PathBuf {
        self.video
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn stem(&self) -> String {
        self.video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string())
    }

    /// Where whisper writes its SRT inside `scratch_dir`: `<scratch>/<stem>.srt`.
    pub fn raw_output(&self, scratch_dir: &Path) -> PathBuf {
        scratch_dir.join(format!("{}.srt", self.stem()))
    }

    /// Final subtitle location: `<dir>/<stem>.<lang>.srt`.
    pub fn subtitle_path(&self) -> PathBuf {
        self.video_dir()
            .join(format!("{}.{}.srt", self.stem(), self.language))
    }

    /// Arguments for one run. Whisper writes into `scratch_dir`, never next
    /// to the video, so an existing `<stem>.srt` track is left alone.
    pub fn build_args(&self, scratch_dir: &Path) -> Vec<String> {
        vec![
            self.video.to_string_lossy().into_owned(),
            "--model".to_string(),
            self.model.as_str().to_string(),
            "--language".to_string(),
            self.language.clone(),
            "--output_dir".to_string(),
            scratch_dir.to_string_lossy().into_owned(),
            "--output_format".to_string(),
            "srt".to_string(),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WhisperOutcome {
    pub output_path: PathBuf,
    pub model: WhisperModel,
    pub language: String,
    /// Wall-clock seconds spent in whisper
    pub duration: f64,
}

/// Time-based progress: `elapsed / estimated`, capped below completion.
pub fn time_progress(elapsed_secs: f64, estimated_secs: f64) -> f64 {
    if estimated_secs <= 0.0 {
        return 0.5;
    }
    (elapsed_secs / estimated_secs).clamp(0.0, PROGRESS_CEILING)
}

/// Probe the video and estimate how long `model` will take.
pub async fn estimate_transcription(video: &Path, model: WhisperModel) -> MediaResult<WhisperEstimate> {
    if !video.is_file() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }
    let duration = get_duration(video).await?;
    Ok(model.estimate(duration))
}

/// Run whisper and place the result at [`WhisperRequest::subtitle_path`].
///
/// Whisper runs inside a scratch directory under `workspace_root`.
/// Progress ticks once a second from `estimated_secs`.
pub async fn transcribe(
    request: &WhisperRequest,
    workspace_root: &Path,
    estimated_secs: f64,
    on_progress: StepCallback,
) -> MediaResult<WhisperOutcome> {
    if !request.video.is_file() {
        return Err(MediaError::FileNotFound(request.video.clone()));
    }
    check_whisper()?;

    info!(
        video = %request.video.display(),
        model = request.model.as_str(),
        language = %request.language,
        "Starting whisper transcription"
    );

    let workspace = job_workspace(workspace_root, "whisper-")?;
    let started = Instant::now();
    let child = Command::new("whisper")
        .args(request.build_args(workspace.path()))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let wait = child.wait_with_output();
    tokio::pin!(wait);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    let output = loop {
        tokio::select! {
            result = &mut wait => break result?,
            _ = ticker.tick() => {
                let progress = time_progress(started.elapsed().as_secs_f64(), estimated_secs);
                on_progress(progress, format!("Generating subtitles... {:.0}%", progress * 100.0));
            }
        }
    };

    let elapsed = started.elapsed().as_secs_f64();
    let status = if output.status.success() { "success" } else { "error" };
    metrics::histogram!(
        "shadow_whisper_duration_seconds",
        "model" => request.model.as_str(),
        "outcome" => status
    )
    .record(elapsed);

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
        return Err(MediaError::whisper_failed(format!(
            "whisper exited with {}: {}",
            output.status,
            tail.trim()
        )));
    }

    let raw = request.raw_output(workspace.path());
    let target = request.subtitle_path();
    if !raw.is_file() {
        return Err(MediaError::whisper_failed(format!(
            "whisper produced no subtitle for {}",
            request.video.display()
        )));
    }
    move_file(&raw, &target).await?;
    debug!(output = %target.display(), "Whisper subtitle in place");

    info!(output = %target.display(), elapsed, "Whisper transcription finished");
    Ok(WhisperOutcome {
        output_path: target,
        model: request.model,
        language: request.language.clone(),
        duration: elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let req = WhisperRequest::new("data/clips/talk.mp4", WhisperModel::Base, "en");
        assert_eq!(
            req.raw_output(Path::new("data/temp/whisper-x")),
            PathBuf::from("data/temp/whisper-x/talk.srt")
        );
        assert_eq!(req.subtitle_path(), PathBuf::from("data/clips/talk.en.srt"));
    }

    #[test]
    fn test_build_args() {
        let req = WhisperRequest::new("clips/a.mp4", WhisperModel::Small, "ko");
        assert_eq!(
            req.build_args(Path::new("temp/whisper-1")).join(" "),
            "clips/a.mp4 --model small --language ko --output_dir temp/whisper-1 --output_format srt"
        );
    }

    #[test]
    fn test_time_progress_is_capped() {
        assert_eq!(time_progress(5.0, 10.0), 0.5);
        assert_eq!(time_progress(50.0, 10.0), 0.95);
        assert_eq!(time_progress(3.0, 0.0), 0.5);
    }

    #[tokio::test]
    async fn test_estimate_missing_video() {
        let err = estimate_transcription(Path::new("/nonexistent/v.mp4"), WhisperModel::Tiny)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
