//! Whisper speech-to-text model catalogue.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whisper model sizes, fastest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum WhisperModel {
    #[default]
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl WhisperModel {
    pub const ALL: [WhisperModel; 5] = [
        WhisperModel::Tiny,
        WhisperModel::Base,
        WhisperModel::Small,
        WhisperModel::Medium,
        WhisperModel::Large,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WhisperModel::Tiny => "tiny",
            WhisperModel::Base => "base",
            WhisperModel::Small => "small",
            WhisperModel::Medium => "medium",
            WhisperModel::Large => "large",
        }
    }

    /// Approximate realtime multiple on CPU.
    pub fn speed_factor(&self) -> f64 {
        match self {
            WhisperModel::Tiny => 32.0,
            WhisperModel::Base => 16.0,
            WhisperModel::Small => 6.0,
            WhisperModel::Medium => 2.0,
            WhisperModel::Large => 1.0,
        }
    }

    /// Download size of the weights.
    pub fn size_label(&self) -> &'static str {
        match self {
            WhisperModel::Tiny => "39M",
            WhisperModel::Base => "74M",
            WhisperModel::Small => "244M",
            WhisperModel::Medium => "769M",
            WhisperModel::Large => "1.5GB",
        }
    }

    /// Estimate transcription time for media of `duration_seconds`.
    pub fn estimate(&self, duration_seconds: f64) -> WhisperEstimate {
        let estimated_seconds = duration_seconds.max(0.0) / self.speed_factor();
        WhisperEstimate {
            model: *self,
            model_size: self.size_label().to_string(),
            processing_speed: format!("{}x", self.speed_factor()),
            duration_seconds,
            estimated_seconds,
            human_estimate: human_duration(estimated_seconds),
        }
    }
}

impl fmt::Display for WhisperModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WhisperModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown whisper model: {}", s))
    }
}

/// Result of a transcription time estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WhisperEstimate {
    pub model: WhisperModel,
    pub model_size: String,
    pub processing_speed: String,
    pub duration_seconds: f64,
    pub estimated_seconds: f64,
    pub human_estimate: String,
}

/// `42.0 seconds`, `3.5 minutes`, `1.2 hours`.
pub fn human_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.1} seconds", seconds)
    } else if seconds < 3600.0 {
        format!("{:.1} minutes", seconds / 60.0)
    } else {
        format!("{:.1} hours", seconds / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_uses_speed_factor() {
        let est = WhisperModel::Small.estimate(600.0);
        assert_eq!(est.estimated_seconds, 100.0);
        assert_eq!(est.human_estimate, "1.7 minutes");
        assert_eq!(est.model_size, "244M");
        assert_eq!(WhisperModel::Tiny.estimate(64.0).estimated_seconds, 2.0);
    }

    #[test]
    fn test_parse_model() {
        assert_eq!("MEDIUM".parse::<WhisperModel>().unwrap(), WhisperModel::Medium);
        assert!("huge".parse::<WhisperModel>().is_err());
    }

    #[test]
    fn test_human_duration() {
        assert_eq!(human_duration(12.34), "12.3 seconds");
        assert_eq!(human_duration(7200.0), "2.0 hours");
    }
}
