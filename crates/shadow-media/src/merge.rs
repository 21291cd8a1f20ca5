//! Clip merging with the concat demuxer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use shadow_models::{sanitize_file_stem, with_extension};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{job_workspace, move_file};
use crate::probe::get_duration;
use crate::progress::StepCallback;

/// Result of a merge.
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub output_path: PathBuf,
    pub clips_count: usize,
    /// Seconds, as probed from the merged file
    pub duration: f64,
}

/// `merged_<YYYYmmdd_HHMMSS>.mp4`
pub fn default_merge_name(now: DateTime<Local>) -> String {
    format!("merged_{}.mp4", now.format("%Y%m%d_%H%M%S"))
}

/// Sanitize a caller-chosen file name and make sure it ends in `.mp4`.
pub fn merge_output_name(requested: Option<&str>, now: DateTime<Local>) -> String {
    match requested.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => with_extension(&sanitize_file_stem(name), "mp4"),
        None => default_merge_name(now),
    }
}

/// Concat demuxer list. Single quotes are escaped as `'\''`.
pub fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

/// Write a concat list of absolute paths to `list_path`.
pub async fn write_concat_list(paths: &[PathBuf], list_path: &Path) -> MediaResult<()> {
    let mut absolute = Vec::with_capacity(paths.len());
    for path in paths {
        let resolved = tokio::fs::canonicalize(path)
            .await
            .map_err(|_| MediaError::FileNotFound(path.clone()))?;
        absolute.push(resolved);
    }
    tokio::fs::write(list_path, concat_list(&absolute)).await?;
    Ok(())
}

/// `ffmpeg -f concat -safe 0 -i list -c copy output`
pub fn concat_command(list_path: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(list_path, output)
        .input_args(["-f", "concat", "-safe", "0"])
        .codec_copy()
}

/// Joins finished clips into one file.
#[derive(Debug, Clone)]
pub struct ClipMerger {
    runner: FfmpegRunner,
    workspace_root: PathBuf,
}

impl ClipMerger {
    pub fn new(runner: FfmpegRunner, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            runner: runner.operation("merge"),
            workspace_root: workspace_root.into(),
        }
    }

    /// Concatenate `clips` in order into `output`.
    ///
    /// The merged file is written inside a scratch directory and only moved to
    /// `output` once ffmpeg succeeded.
    pub async fn merge(&self, clips: &[PathBuf], output: &Path, on_progress: StepCallback) -> MediaResult<MergeOutcome> {
        if clips.is_empty() {
            return Err(MediaError::invalid_input("no clips to merge"));
        }
        for clip in clips {
            if !clip.is_file() {
                return Err(MediaError::FileNotFound(clip.clone()));
            }
        }

        let workspace = job_workspace(&self.workspace_root, "merge-")?;
        let list_path = workspace.path().join("clips.txt");
        write_concat_list(clips, &list_path).await?;
        on_progress(0.05, format!("Merging {} clips", clips.len()));

        // Input durations drive progress; an unprobeable clip only costs precision
        let mut expected_secs = 0.0;
        for clip in clips {
            match get_duration(clip).await {
                Ok(d) => expected_secs += d,
                Err(e) => warn!(clip = %clip.display(), error = %e, "Could not probe clip duration"),
            }
        }
        let expected_ms = (expected_secs * 1000.0) as i64;

        let staged = workspace.path().join("merged.mp4");
        let cmd = concat_command(&list_path, &staged);
        let callback = Arc::clone(&on_progress);
        self.runner
            .run_with_progress(&cmd, move |p| {
                callback(0.05 + 0.9 * p.fraction(expected_ms), "Merging clips".to_string());
            })
            .await?;

        let duration = get_duration(&staged).await.unwrap_or(expected_secs);
        move_file(&staged, output).await?;

        info!(
            output = %output.display(),
            clips = clips.len(),
            duration,
            "Merged clips"
        );
        Ok(MergeOutcome {
            output_path: output.to_path_buf(),
            clips_count: clips.len(),
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/data/a.mp4"), PathBuf::from("/data/it's.mp4")]);
        assert_eq!(list, "file '/data/a.mp4'\nfile '/data/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_merge_output_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(merge_output_name(None, now), "merged_20240309_140507.mp4");
        assert_eq!(merge_output_name(Some("  "), now), "merged_20240309_140507.mp4");
        assert_eq!(merge_output_name(Some("lesson 1"), now), "lesson 1.mp4");
        assert_eq!(merge_output_name(Some("../x.MP4"), now), "_x.MP4");
    }

    #[test]
    fn test_concat_command() {
        let args = concat_command(Path::new("list.txt"), Path::new("out.mp4"))
            .build_args()
            .join(" ");
        assert!(args.contains("-f concat -safe 0 -i list.txt -c copy out.mp4"));
    }

    #[tokio::test]
    async fn test_write_concat_list_uses_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("a.mp4");
        std::fs::write(&clip, b"x").unwrap();
        let list = dir.path().join("list.txt");

        write_concat_list(&[clip.clone()], &list).await.unwrap();
        let content = std::fs::read_to_string(&list).unwrap();
        let canonical = std::fs::canonicalize(&clip).unwrap();
        assert_eq!(content, format!("file '{}'\n", canonical.display()));

        let missing = write_concat_list(&[dir.path().join("nope.mp4")], &list).await;
        assert!(matches!(missing, Err(MediaError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_merge_rejects_missing_clip() {
        let dir = tempfile::tempdir().unwrap();
        let merger = ClipMerger::new(FfmpegRunner::new(), dir.path());
        let missing = dir.path().join("missing.mp4");
        let err = merger
            .merge(&[missing.clone()], &dir.path().join("out.mp4"), Arc::new(|_, _| {}))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(p) if p == missing));
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_merge_duration_is_sum_of_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FfmpegRunner::new();
        let mut clips = Vec::new();
        for (i, secs) in [1.0, 2.0].iter().enumerate() {
            let clip = dir.path().join(format!("c{}.mp4", i));
            let cmd = FfmpegCommand::lavfi(format!("testsrc=size=320x240:rate=25:d={}", secs), &clip)
                .add_lavfi("sine=frequency=440")
                .output_duration(*secs)
                .video_codec("libx264")
                .audio_codec("aac");
            runner.run(&cmd).await.unwrap();
            clips.push(clip);
        }

        let out = dir.path().join("merged.mp4");
        let outcome = ClipMerger::new(runner, dir.path().join("temp"))
            .merge(&clips, &out, Arc::new(|_, _| {}))
            .await
            .unwrap();
        assert_eq!(outcome.clips_count, 2);
        assert!((outcome.duration - 3.0).abs() < 0.3);
    }
}
