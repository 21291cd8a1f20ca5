//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Per-invocation ffmpeg timeout, unset means none
    pub ffmpeg_timeout_secs: Option<u64>,
    /// HTTP TTS service; the local edge-tts CLI is used when unset
    pub tts_service_url: Option<String>,
    /// Timeout for one TTS request
    pub tts_timeout: Duration,
    /// Subtitle languages requested from yt-dlp
    pub subtitle_langs: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            ffmpeg_timeout_secs: None,
            tts_service_url: None,
            tts_timeout: Duration::from_secs(30),
            subtitle_langs: default_subtitle_langs(),
        }
    }
}

fn default_subtitle_langs() -> Vec<String> {
    shadow_media::download::DEFAULT_SUBTITLE_LANGS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(2),
            ffmpeg_timeout_secs: std::env::var("FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|n| *n > 0),
            tts_service_url: std::env::var("TTS_SERVICE_URL")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            tts_timeout: Duration::from_secs(
                std::env::var("TTS_PROVIDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            subtitle_langs: std::env::var("DEFAULT_SUBTITLE_LANGS")
                .ok()
                .map(|s| parse_langs(&s))
                .filter(|langs| !langs.is_empty())
                .unwrap_or_else(default_subtitle_langs),
        }
    }
}

/// `en, ko` -> `["en", "ko"]`
pub fn parse_langs(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_langs() {
        assert_eq!(parse_langs(" en, ko ,,ja"), vec!["en", "ko", "ja"]);
        assert!(parse_langs(" , ").is_empty());
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert!(config.ffmpeg_timeout_secs.is_none());
        assert!(config.subtitle_langs.contains(&"ko".to_string()));
    }
}
