//! End-to-end media tests against real ffmpeg/ffprobe binaries.
//!
//! Run with `cargo test -p shadow-media -- --ignored` on a machine with the
//! tools installed.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use shadow_media::{
    extract_segment, generate_final_video, generate_thumbnail, probe_video, ClipMerger, FfmpegRunner,
    FinalVideoRequest, RepeatRequest, RepeatVideoGenerator, StepCallback, ThumbnailRequest, ThumbnailTemplate,
};
use shadow_models::{GenerationConfig, SubtitleMode, TimeRange, Timestamp, FOCUS_CARD_SECS};

/// Render a short test pattern with a sine tone.
fn sample_video(dir: &Path, name: &str, secs: u32) -> PathBuf {
    let output = dir.join(name);
    let status = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=duration={}:size=320x240:rate=25", secs))
        .args(["-f", "lavfi", "-i"])
        .arg(format!("sine=frequency=440:duration={}", secs))
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest"])
        .arg(&output)
        .status()
        .expect("ffmpeg must be installed");
    assert!(status.success());
    output
}

fn quiet() -> StepCallback {
    Arc::new(|_, _| {})
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_probe_sample() {
    let dir = tempfile::tempdir().unwrap();
    let video = sample_video(dir.path(), "a.mp4", 2);

    let info = probe_video(&video).await.unwrap();
    assert!((info.duration - 2.0).abs() < 0.2);
    assert_eq!(info.width, 320);
    assert_eq!(info.height, 240);
    assert!(info.has_audio);
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_extract_segment() {
    let dir = tempfile::tempdir().unwrap();
    let video = sample_video(dir.path(), "a.mp4", 4);
    let output = dir.path().join("cut.mp4");

    extract_segment(
        &FfmpegRunner::new(),
        &video,
        &output,
        Timestamp::from_secs_f64(1.0),
        Timestamp::from_secs_f64(2.5),
        |_| {},
    )
    .await
    .unwrap();

    let info = probe_video(&output).await.unwrap();
    assert!((info.duration - 1.5).abs() < 0.3);
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_merge_two_clips() {
    let dir = tempfile::tempdir().unwrap();
    let clips = vec![
        sample_video(dir.path(), "a.mp4", 2),
        sample_video(dir.path(), "b.mp4", 3),
    ];
    let output = dir.path().join("merged.mp4");

    let merger = ClipMerger::new(FfmpegRunner::new(), dir.path().join("work"));
    let outcome = merger.merge(&clips, &output, quiet()).await.unwrap();

    assert_eq!(outcome.clips_count, 2);
    assert!((outcome.duration - 5.0).abs() < 0.5);
    assert!(output.is_file());
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_thumbnail_and_final_video() {
    let dir = tempfile::tempdir().unwrap();
    let video = sample_video(dir.path(), "a.mp4", 2);
    let thumbnail = dir.path().join("a_thumb.jpg");

    let request = ThumbnailRequest {
        video: video.clone(),
        time: Timestamp::from_secs_f64(1.0),
        output: thumbnail.clone(),
        text: Some("Shadowing".to_string()),
        subtitle: Some("Listen and repeat".to_string()),
        template: ThumbnailTemplate::Shadowing,
    };
    let rendered = generate_thumbnail(&FfmpegRunner::new(), &request, dir.path()).await.unwrap();
    assert_eq!(rendered, thumbnail);
    assert!(thumbnail.is_file());

    let output = dir.path().join("a_final.mp4");
    let final_request = FinalVideoRequest {
        video,
        thumbnail,
        intro_secs: 1.0,
        output: output.clone(),
    };
    let outcome = generate_final_video(&FfmpegRunner::new(), &final_request, dir.path(), quiet())
        .await
        .unwrap();
    assert!((outcome.duration - 3.0).abs() < 0.5);
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_repeat_duration_scales_with_count() {
    let dir = tempfile::tempdir().unwrap();
    let video = sample_video(dir.path(), "a.mp4", 4);
    let output = dir.path().join("a_repeat3.mp4");

    let config = GenerationConfig {
        repeat_count: 3,
        subtitle_modes: vec![SubtitleMode::NoSubtitle],
        focus_cards: true,
        ..Default::default()
    };
    let request = RepeatRequest {
        video,
        ranges: vec![TimeRange::new(Timestamp::from_secs_f64(1.0), Timestamp::from_secs_f64(3.0))],
        cues: Vec::new(),
        config,
        output: output.clone(),
    };

    let generator = RepeatVideoGenerator::new(FfmpegRunner::new(), dir.path().join("work"));
    let outcome = generator.generate(&request, quiet()).await.unwrap();

    // Three 2s repetitions with a focus card between each pair
    let expected = 3.0 * 2.0 + 2.0 * FOCUS_CARD_SECS;
    assert_eq!(outcome.repeat_count, 3);
    assert!((outcome.duration - expected).abs() < 0.6, "duration {}", outcome.duration);
    assert!(output.is_file());
}
