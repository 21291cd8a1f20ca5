//! Repeat video generation settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Maximum repetitions per segment.
pub const MAX_REPEAT_COUNT: u32 = 10;

/// Length of the card shown between repetitions, in seconds.
pub const FOCUS_CARD_SECS: f64 = 2.0;

/// Messages cycled on focus cards.
pub const FOCUS_CARD_MESSAGES: [&str; 2] = ["Focus again!", "Do you remember?"];

/// Which subtitles are burned into one repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleMode {
    NoSubtitle,
    En,
    Ko,
    EnKo,
}

impl SubtitleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitleMode::NoSubtitle => "no_subtitle",
            SubtitleMode::En => "en",
            SubtitleMode::Ko => "ko",
            SubtitleMode::EnKo => "en_ko",
        }
    }

    pub fn needs_subtitles(&self) -> bool {
        !matches!(self, SubtitleMode::NoSubtitle)
    }

    /// Line(s) shown for a cue in this mode. `None` when nothing is burned in.
    pub fn render_text(&self, text: &str, translation: Option<&str>) -> Option<String> {
        let translation = translation.map(str::trim).filter(|t| !t.is_empty());
        match self {
            SubtitleMode::NoSubtitle => None,
            SubtitleMode::En => Some(text.to_string()),
            SubtitleMode::Ko => Some(translation.unwrap_or(text).to_string()),
            SubtitleMode::EnKo => Some(match translation {
                Some(t) => format!("{}\n{}", text, t),
                None => text.to_string(),
            }),
        }
    }
}

/// Burned-in subtitle appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SubtitleStyle {
    pub font: String,
    pub font_size: u32,
    /// Left margin in pixels
    pub x: u32,
    /// Vertical margin in pixels
    pub y: u32,
    pub shadow: bool,
    /// `#RRGGBBAA` background colour
    pub background: String,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font: "Arial".to_string(),
            font_size: 48,
            x: 50,
            y: 600,
            shadow: true,
            background: "#00000080".to_string(),
        }
    }
}

/// Speech synthesis backends understood by the TTS service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TtsProvider {
    #[default]
    EdgeTts,
    Gtts,
    OpenaiTts,
    GoogleCloudTts,
}

impl TtsProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            TtsProvider::EdgeTts => "edge-tts",
            TtsProvider::Gtts => "gtts",
            TtsProvider::OpenaiTts => "openai-tts",
            TtsProvider::GoogleCloudTts => "google-cloud-tts",
        }
    }
}

/// Narration settings for repetitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct TtsConfig {
    pub provider: TtsProvider,
    pub voice: String,
    #[validate(range(min = 0.25, max = 4.0))]
    pub speed: f32,
    /// Pitch shift in Hz
    #[validate(range(min = -100, max = 100))]
    pub pitch: i32,
    /// Narrate every repetition instead of only the first
    pub every_repetition: bool,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::EdgeTts,
            voice: "en-US-GuyNeural".to_string(),
            speed: 1.0,
            pitch: 0,
            every_repetition: false,
        }
    }
}

impl TtsConfig {
    /// edge-tts style rate string, e.g. `+25%`.
    pub fn rate_arg(&self) -> String {
        let pct = ((self.speed - 1.0) * 100.0).round() as i32;
        format!("{:+}%", pct)
    }

    /// edge-tts style pitch string, e.g. `-5Hz`.
    pub fn pitch_arg(&self) -> String {
        format!("{:+}Hz", self.pitch)
    }

    pub fn applies_to(&self, repetition: u32) -> bool {
        self.every_repetition || repetition == 0
    }
}

fn default_repeat_count() -> u32 {
    3
}

fn default_modes() -> Vec<SubtitleMode> {
    vec![SubtitleMode::NoSubtitle, SubtitleMode::EnKo, SubtitleMode::EnKo]
}

fn default_true() -> bool {
    true
}

fn validate_modes(modes: &[SubtitleMode]) -> Result<(), ValidationError> {
    if modes.is_empty() {
        return Err(ValidationError::new("subtitle_modes_empty"));
    }
    Ok(())
}

/// Full configuration for one repeat video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct GenerationConfig {
    #[serde(default = "default_repeat_count")]
    #[validate(range(min = 1, max = 10))]
    pub repeat_count: u32,

    #[serde(default = "default_modes")]
    #[validate(custom(function = "validate_modes"))]
    pub subtitle_modes: Vec<SubtitleMode>,

    #[serde(default)]
    pub style: SubtitleStyle,

    #[serde(default)]
    #[validate(nested)]
    pub tts: Option<TtsConfig>,

    /// Phrase coloured inside burned subtitles
    #[serde(default)]
    pub highlight_phrase: Option<String>,

    #[serde(default = "default_true")]
    pub focus_cards: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            repeat_count: default_repeat_count(),
            subtitle_modes: default_modes(),
            style: SubtitleStyle::default(),
            tts: None,
            highlight_phrase: None,
            focus_cards: true,
        }
    }
}

impl GenerationConfig {
    /// One mode per repetition. A short list is padded with its last mode and a
    /// long one truncated.
    pub fn modes_for_repetitions(&self) -> Vec<SubtitleMode> {
        let pad = self
            .subtitle_modes
            .last()
            .copied()
            .unwrap_or(SubtitleMode::NoSubtitle);
        (0..self.repeat_count as usize)
            .map(|i| self.subtitle_modes.get(i).copied().unwrap_or(pad))
            .collect()
    }

    /// Distinct modes that need a subtitle file.
    pub fn subtitle_modes_in_use(&self) -> Vec<SubtitleMode> {
        let mut modes: Vec<SubtitleMode> = Vec::new();
        for mode in self.modes_for_repetitions() {
            if mode.needs_subtitles() && !modes.contains(&mode) {
                modes.push(mode);
            }
        }
        modes
    }

    /// Expected output length for a segment of `segment_secs`.
    pub fn expected_duration(&self, segment_secs: f64) -> f64 {
        let cards = if self.focus_cards {
            self.repeat_count.saturating_sub(1) as f64 * FOCUS_CARD_SECS
        } else {
            0.0
        };
        segment_secs * self.repeat_count as f64 + cards
    }
}

/// Rough wall-clock estimate for rendering the selected segments.
///
/// Extraction, subtitle rendering, repetition and merging cost about
/// 2 + 3 + 1 + 2 times the segment length at 720p, scaled by pixel count and
/// clamped to 5..=300 seconds.
pub fn estimate_generation_secs(total_segment_secs: f64, width: u32, height: u32) -> f64 {
    let resolution_factor = (width as f64 * height as f64) / (1280.0 * 720.0);
    let estimate = total_segment_secs * 8.0 * resolution_factor;
    estimate.clamp(5.0, 300.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: GenerationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GenerationConfig::default());
        assert_eq!(config.style.font_size, 48);
        assert_eq!(config.style.background, "#00000080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_modes_padding() {
        let config = GenerationConfig {
            repeat_count: 5,
            subtitle_modes: vec![SubtitleMode::NoSubtitle, SubtitleMode::En],
            ..Default::default()
        };
        assert_eq!(
            config.modes_for_repetitions(),
            vec![
                SubtitleMode::NoSubtitle,
                SubtitleMode::En,
                SubtitleMode::En,
                SubtitleMode::En,
                SubtitleMode::En
            ]
        );
        assert_eq!(config.subtitle_modes_in_use(), vec![SubtitleMode::En]);

        let short = GenerationConfig { repeat_count: 1, ..Default::default() };
        assert_eq!(short.modes_for_repetitions(), vec![SubtitleMode::NoSubtitle]);
        assert!(short.subtitle_modes_in_use().is_empty());
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let config = GenerationConfig { repeat_count: 11, ..Default::default() };
        assert!(config.validate().is_err());
        let config = GenerationConfig { repeat_count: 0, ..Default::default() };
        assert!(config.validate().is_err());
        let config = GenerationConfig { subtitle_modes: vec![], ..Default::default() };
        assert!(config.validate().is_err());
        let config = GenerationConfig {
            tts: Some(TtsConfig { speed: 9.0, ..Default::default() }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_render_text_per_mode() {
        assert_eq!(SubtitleMode::NoSubtitle.render_text("hi", Some("안녕")), None);
        assert_eq!(SubtitleMode::En.render_text("hi", Some("안녕")).unwrap(), "hi");
        assert_eq!(SubtitleMode::Ko.render_text("hi", Some("안녕")).unwrap(), "안녕");
        assert_eq!(SubtitleMode::Ko.render_text("hi", Some("  ")).unwrap(), "hi");
        assert_eq!(SubtitleMode::EnKo.render_text("hi", Some("안녕")).unwrap(), "hi\n안녕");
        assert_eq!(SubtitleMode::EnKo.render_text("hi", None).unwrap(), "hi");
    }

    #[test]
    fn test_tts_args() {
        let tts = TtsConfig { speed: 1.25, pitch: -5, ..Default::default() };
        assert_eq!(tts.rate_arg(), "+25%");
        assert_eq!(tts.pitch_arg(), "-5Hz");
        assert_eq!(TtsConfig::default().rate_arg(), "+0%");
        assert!(tts.applies_to(0));
        assert!(!tts.applies_to(1));
        let provider: TtsProvider = serde_json::from_str("\"google-cloud-tts\"").unwrap();
        assert_eq!(provider, TtsProvider::GoogleCloudTts);
    }

    #[test]
    fn test_expected_duration() {
        let config = GenerationConfig::default();
        assert_eq!(config.expected_duration(4.0), 16.0);
        let no_cards = GenerationConfig { focus_cards: false, ..Default::default() };
        assert_eq!(no_cards.expected_duration(4.0), 12.0);
    }

    #[test]
    fn test_estimate_generation_clamps() {
        assert_eq!(estimate_generation_secs(0.1, 1280, 720), 5.0);
        assert_eq!(estimate_generation_secs(10.0, 1280, 720), 80.0);
        assert_eq!(estimate_generation_secs(10.0, 1920, 1080), 180.0);
        assert_eq!(estimate_generation_secs(100.0, 1920, 1080), 300.0);
    }
}
