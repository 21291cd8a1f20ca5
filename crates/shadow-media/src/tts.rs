//! Text-to-speech narration.
//!
//! Narration is synthesized per cue, delayed to the cue start and mixed over
//! the repetition's own audio. Two backends exist: an HTTP TTS service that
//! fronts every provider, and the local `edge-tts` CLI.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info};

use shadow_models::{SubtitleCue, TtsConfig, TtsProvider};
use shadow_subtitle::strip_tags;

use crate::command::{check_edge_tts, FfmpegCommand};
use crate::error::{MediaError, MediaResult};
use crate::filters::{narration_mix_filter, silent_audio_source};

/// A speech backend writing one audio file per call.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn synthesize(&self, text: &str, config: &TtsConfig, output: &Path) -> MediaResult<()>;
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    provider: &'a str,
    voice: &'a str,
    rate: String,
    pitch: String,
    speed: f32,
}

/// Client for an HTTP TTS service exposing `POST /synthesize`.
#[derive(Debug, Clone)]
pub struct HttpSpeechSynthesizer {
    http: Client,
    base_url: String,
}

impl HttpSpeechSynthesizer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> MediaResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("shadow-media/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MediaError::tts_failed(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn synthesize(&self, text: &str, config: &TtsConfig, output: &Path) -> MediaResult<()> {
        let body = SynthesizeRequest {
            text,
            provider: config.provider.as_str(),
            voice: &config.voice,
            rate: config.rate_arg(),
            pitch: config.pitch_arg(),
            speed: config.speed,
        };

        let response = self
            .http
            .post(format!("{}/synthesize", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| MediaError::tts_failed(format!("TTS request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MediaError::tts_failed(format!(
                "TTS service returned {}: {}",
                status, error_text
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| MediaError::tts_failed(format!("TTS response body: {}", e)))?;
        if audio.is_empty() {
            return Err(MediaError::tts_failed("TTS service returned no audio"));
        }
        tokio::fs::write(output, &audio).await?;
        Ok(())
    }
}

/// Local `edge-tts` command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeTtsCli;

#[async_trait]
impl SpeechSynthesizer for EdgeTtsCli {
    fn name(&self) -> &'static str {
        "edge-tts"
    }

    async fn synthesize(&self, text: &str, config: &TtsConfig, output: &Path) -> MediaResult<()> {
        if config.provider != TtsProvider::EdgeTts {
            return Err(MediaError::tts_failed(format!(
                "provider {} needs a TTS service; set TTS_SERVICE_URL",
                config.provider.as_str()
            )));
        }
        check_edge_tts()?;

        let result = Command::new("edge-tts")
            .arg("--text")
            .arg(text)
            .arg("--voice")
            .arg(&config.voice)
            .arg(format!("--rate={}", config.rate_arg()))
            .arg(format!("--pitch={}", config.pitch_arg()))
            .arg("--write-media")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(MediaError::tts_failed(format!(
                "edge-tts exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// A synthesized clip placed at `start_ms` within the repetition.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationClip {
    pub start_ms: u64,
    pub path: PathBuf,
}

/// Synthesize every non-empty cue into `dir`.
///
/// Cue times must already be relative to the segment start.
pub async fn synthesize_cues(
    synthesizer: &dyn SpeechSynthesizer,
    cues: &[SubtitleCue],
    config: &TtsConfig,
    dir: &Path,
) -> MediaResult<Vec<NarrationClip>> {
    let mut clips = Vec::with_capacity(cues.len());
    for (i, cue) in cues.iter().enumerate() {
        let text = strip_tags(&cue.text).replace('\n', " ");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let path = dir.join(format!("narration_{:04}.mp3", i));
        debug!(backend = synthesizer.name(), index = i, "Synthesizing cue");
        synthesizer.synthesize(text, config, &path).await?;
        clips.push(NarrationClip {
            start_ms: cue.start_time.as_millis(),
            path,
        });
    }
    info!(
        backend = synthesizer.name(),
        clips = clips.len(),
        voice = %config.voice,
        "Synthesized narration"
    );
    Ok(clips)
}

/// Command mixing narration clips over `video` into `output`.
///
/// A video without audio gets a silent base track of `duration` seconds.
pub fn narration_mix_command(
    video: &Path,
    clips: &[NarrationClip],
    has_audio: bool,
    duration: f64,
    output: &Path,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(video, output);
    for clip in clips {
        cmd = cmd.add_input(&clip.path);
    }

    let base = if has_audio {
        "0:a".to_string()
    } else {
        cmd = cmd
            .add_lavfi(silent_audio_source())
            .duration(duration);
        format!("{}:a", clips.len() + 1)
    };

    let delays: Vec<u64> = clips.iter().map(|c| c.start_ms).collect();
    cmd.filter_complex(narration_mix_filter(&base, &delays))
        .map("0:v")
        .map("[aout]")
        .video_codec("copy")
        .audio_codec("aac")
        .audio_bitrate("192k")
        .output_args(["-ar", "44100", "-ac", "2"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_models::Timestamp;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cue(start_ms: u64, text: &str) -> SubtitleCue {
        SubtitleCue::new(0, Timestamp::from_millis(start_ms), Timestamp::from_millis(start_ms + 1000), text)
    }

    #[tokio::test]
    async fn test_http_synthesizer_writes_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/synthesize"))
            .and(body_partial_json(serde_json::json!({
                "provider": "edge-tts",
                "voice": "en-US-GuyNeural",
                "rate": "+0%"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3audio".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a.mp3");
        let synth = HttpSpeechSynthesizer::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();
        synth.synthesize("Hello", &TtsConfig::default(), &out).await.unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"ID3audio");
    }

    #[tokio::test]
    async fn test_http_synthesizer_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/synthesize"))
            .respond_with(ResponseTemplate::new(503).set_body_string("provider down"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let synth = HttpSpeechSynthesizer::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = synth
            .synthesize("Hello", &TtsConfig::default(), &dir.path().join("a.mp3"))
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("503"));
        assert!(message.contains("provider down"));
    }

    #[tokio::test]
    async fn test_synthesize_cues_skips_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/synthesize"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3".to_vec()))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let synth = HttpSpeechSynthesizer::new(server.uri(), Duration::from_secs(5)).unwrap();
        let cues = vec![cue(0, "<i>Hi</i>"), cue(800, "  "), cue(1500, "Again")];
        let clips = synthesize_cues(&synth, &cues, &TtsConfig::default(), dir.path())
            .await
            .unwrap();

        assert_eq!(clips.iter().map(|c| c.start_ms).collect::<Vec<_>>(), vec![0, 1500]);
    }

    #[tokio::test]
    async fn test_edge_cli_rejects_other_providers() {
        let config = TtsConfig {
            provider: TtsProvider::OpenaiTts,
            ..TtsConfig::default()
        };
        let err = EdgeTtsCli
            .synthesize("Hi", &config, Path::new("x.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::TtsFailed { .. }));
    }

    #[test]
    fn test_narration_mix_command_without_audio() {
        let clips = vec![NarrationClip {
            start_ms: 250,
            path: PathBuf::from("n0.mp3"),
        }];
        let args = narration_mix_command(Path::new("rep.mp4"), &clips, false, 3.0, Path::new("out.mp4"))
            .build_args()
            .join(" ");
        assert!(args.contains("-i rep.mp4 -i n0.mp3 -f lavfi -t 3.000 -i anullsrc=r=44100:cl=stereo"));
        assert!(args.contains("[2:a][s0]amix=inputs=2"));
        assert!(args.contains("-map 0:v -map [aout] -c:v copy -c:a aac -b:a 192k"));
    }
}
