//! Whisper output placement, driven by a stand-in `whisper` script on PATH.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use shadow_media::{transcribe, StepCallback, WhisperRequest};
use shadow_models::WhisperModel;

/// Writes `<output_dir>/talk.srt` with the requested language as its text.
const FAKE_WHISPER: &str = r#"#!/bin/sh
out=""
lang=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output_dir) out="$2"; shift ;;
    --language) lang="$2"; shift ;;
  esac
  shift
done
printf '1\n00:00:00,000 --> 00:00:01,000\nWHISPER %s\n' "$lang" > "$out/talk.srt"
"#;

fn install_fake_whisper(bin_dir: &Path) {
    std::fs::create_dir_all(bin_dir).unwrap();
    let script = bin_dir.join("whisper");
    std::fs::write(&script, FAKE_WHISPER).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let path = std::env::var("PATH").unwrap_or_default();
    std::env::set_var("PATH", format!("{}:{}", bin_dir.display(), path));
}

fn quiet() -> StepCallback {
    Arc::new(|_, _| {})
}

#[tokio::test]
async fn test_transcribe_keeps_existing_track_and_languages_apart() {
    let dir = tempfile::tempdir().unwrap();
    install_fake_whisper(&dir.path().join("bin"));

    let clips = dir.path().join("clips");
    let temp = dir.path().join("temp");
    std::fs::create_dir_all(&clips).unwrap();
    let video = clips.join("talk.mp4");
    std::fs::write(&video, b"not really a video").unwrap();
    let original = clips.join("talk.srt");
    std::fs::write(&original, "1\n00:00:00,000 --> 00:00:01,000\nORIGINAL\n").unwrap();

    let english = WhisperRequest::new(&video, WhisperModel::Tiny, "en");
    let korean = WhisperRequest::new(&video, WhisperModel::Tiny, "ko");
    let (en, ko) = tokio::join!(
        transcribe(&english, &temp, 1.0, quiet()),
        transcribe(&korean, &temp, 1.0, quiet()),
    );
    let (en, ko) = (en.unwrap(), ko.unwrap());

    assert_eq!(en.output_path, clips.join("talk.en.srt"));
    assert_eq!(ko.output_path, clips.join("talk.ko.srt"));
    assert!(std::fs::read_to_string(&en.output_path).unwrap().contains("WHISPER en"));
    assert!(std::fs::read_to_string(&ko.output_path).unwrap().contains("WHISPER ko"));
    assert!(std::fs::read_to_string(&original).unwrap().contains("ORIGINAL"));

    // Scratch directories are cleaned up
    assert_eq!(std::fs::read_dir(&temp).unwrap().count(), 0);
}
