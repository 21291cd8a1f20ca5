//! Subtitle timestamp parsing and formatting.
//!
//! Cue times travel through the API in SRT notation (`HH:MM:SS,mmm`), while
//! ffmpeg wants plain seconds. [`Timestamp`] stores milliseconds and converts
//! between the two.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Maximum reasonable video duration (24 hours in seconds).
pub const MAX_VIDEO_DURATION_SECS: f64 = 86400.0;

/// Errors produced while parsing a timestamp string.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("timestamp is empty")]
    Empty,

    #[error("invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("invalid timestamp format: {0}")]
    InvalidFormat(String),

    #[error("timestamp components must not be negative")]
    Negative,

    #[error("start time must be before end time")]
    StartNotBeforeEnd,

    #[error("timestamp exceeds maximum duration of {0} seconds")]
    ExceedsMaxDuration(f64),
}

/// Parse a timestamp string to total seconds.
///
/// Supports `HH:MM:SS`, `MM:SS` and `SS`, each with an optional fractional
/// part separated by `.` or `,` (SRT style).
///
/// # Examples
/// ```
/// use shadow_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("00:00:01,500").unwrap(), 1.5);
/// assert_eq!(parse_timestamp("90").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let normalized = ts.replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();

    let field = |name: &'static str, raw: &str| -> Result<f64, TimestampError> {
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| TimestampError::InvalidValue(name, raw.to_string()))?;
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        Ok(value)
    };

    match parts.as_slice() {
        [s] => field("seconds", s),
        [m, s] => Ok(field("minutes", m)? * 60.0 + field("seconds", s)?),
        [h, m, s] => {
            Ok(field("hours", h)? * 3600.0 + field("minutes", m)? * 60.0 + field("seconds", s)?)
        }
        _ => Err(TimestampError::InvalidFormat(ts.to_string())),
    }
}

/// Format seconds as `HH:MM:SS.mmm`, the notation ffmpeg accepts for `-ss`/`-to`.
pub fn format_seconds(total_secs: f64) -> String {
    let ms = (total_secs.max(0.0) * 1000.0).round() as u64;
    let ts = Timestamp::from_millis(ms);
    ts.to_string().replace(',', ".")
}

/// A cue boundary with millisecond precision.
///
/// Displays and serializes as SRT notation (`00:01:02,345`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create from milliseconds.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Create from seconds, rounding to the nearest millisecond.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs.max(0.0) * 1000.0).round() as u64)
    }

    /// Milliseconds since the start of the media.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Seconds since the start of the media.
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Saturating difference `self - earlier`.
    pub fn saturating_sub(&self, earlier: Timestamp) -> Timestamp {
        Timestamp(self.0.saturating_sub(earlier.0))
    }

    /// Ffmpeg-friendly rendering (`HH:MM:SS.mmm`).
    pub fn to_ffmpeg(&self) -> String {
        self.to_string().replace(',', ".")
    }

    /// File-name-safe rendering, `00:01:02,345` becomes `00_01_02_345`.
    pub fn to_file_tag(&self) -> String {
        self.to_string().replace([':', ',', '.'], "_")
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / 3_600_000;
        let minutes = (self.0 % 3_600_000) / 60_000;
        let seconds = (self.0 % 60_000) / 1000;
        let millis = self.0 % 1000;
        write!(f, "{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let secs = parse_timestamp(s)?;
        if secs > MAX_VIDEO_DURATION_SECS {
            return Err(TimestampError::ExceedsMaxDuration(MAX_VIDEO_DURATION_SECS));
        }
        Ok(Timestamp::from_secs_f64(secs))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for Timestamp {
    fn schema_name() -> String {
        "Timestamp".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

/// Validate a start/end pair and return it in order.
pub fn validate_range(start: &str, end: &str) -> Result<(Timestamp, Timestamp), TimestampError> {
    let start: Timestamp = start.parse()?;
    let end: Timestamp = end.parse()?;
    if start >= end {
        return Err(TimestampError::StartNotBeforeEnd);
    }
    Ok((start, end))
}
