//! ffprobe queries.

use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Frame rate assumed when ffprobe reports none.
const FALLBACK_FPS: f64 = 30.0;

/// What the repeat pipeline needs to know about a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub has_audio: bool,
}

impl VideoInfo {
    /// `WxH`, the size argument of lavfi sources.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

async fn run_ffprobe(path: &Path, args: &[&str]) -> MediaResult<Vec<u8>> {
    if !path.is_file() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args(["-v", "error"])
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("ffprobe exited with {} for {}", output.status, path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
        });
    }
    Ok(output.stdout)
}

/// Resolution, frame rate, duration and audio presence of a video.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    let stdout = run_ffprobe(
        path,
        &[
            "-print_format",
            "json",
            "-show_entries",
            "format=duration:stream=codec_type,width,height,avg_frame_rate,r_frame_rate",
        ],
    )
    .await?;
    let info = video_info_from_report(&stdout)?;
    debug!(
        path = %path.display(),
        resolution = %info.resolution(),
        duration = info.duration,
        has_audio = info.has_audio,
        "Probed video"
    );
    Ok(info)
}

fn video_info_from_report(stdout: &[u8]) -> MediaResult<VideoInfo> {
    let report: ProbeReport = serde_json::from_slice(stdout)?;

    let video = report
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("no video stream".to_string()))?;

    let fps = [&video.avg_frame_rate, &video.r_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|rate| parse_frame_rate(rate))
        .unwrap_or(FALLBACK_FPS);

    Ok(VideoInfo {
        duration: report
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.trim().parse().ok())
            .unwrap_or(0.0),
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        fps,
        has_audio: report.streams.iter().any(|s| s.codec_type == "audio"),
    })
}

/// Container duration in seconds. Works for audio-only files too.
pub async fn get_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();
    let stdout = run_ffprobe(
        path,
        &["-show_entries", "format=duration", "-of", "default=noprint_wrappers=1:nokey=1"],
    )
    .await?;
    let raw = String::from_utf8_lossy(&stdout);
    raw.trim().parse().map_err(|_| MediaError::FfprobeFailed {
        message: format!("no duration reported for {}", path.display()),
        stderr: Some(raw.trim().to_string()),
    })
}

/// `30000/1001` or `29.97`. A zero denominator or zero rate is no rate.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.parse::<f64>().ok()? / den
        }
        None => raw.parse().ok()?,
    };
    (rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("0/1"), None);
    }

    #[test]
    fn test_video_info_from_report() {
        let json = br#"{
            "format": {"duration": "12.480000"},
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080,
                 "avg_frame_rate": "0/0", "r_frame_rate": "25/1"},
                {"codec_type": "audio"}
            ]
        }"#;
        let info = video_info_from_report(json).unwrap();
        assert_eq!(info.resolution(), "1920x1080");
        assert_eq!(info.fps, 25.0);
        assert!(info.has_audio);
        assert!((info.duration - 12.48).abs() < 1e-9);
    }

    #[test]
    fn test_silent_video_without_duration() {
        let json = br#"{"streams": [{"codec_type": "video", "width": 640, "height": 360}]}"#;
        let info = video_info_from_report(json).unwrap();
        assert!(!info.has_audio);
        assert_eq!(info.duration, 0.0);
        assert_eq!(info.fps, FALLBACK_FPS);
    }

    #[test]
    fn test_audio_only_is_not_a_video() {
        let json = br#"{"format": {"duration": "3.0"}, "streams": [{"codec_type": "audio"}]}"#;
        assert!(matches!(video_info_from_report(json), Err(MediaError::InvalidVideo(_))));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = get_duration("/nonexistent/clip.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
