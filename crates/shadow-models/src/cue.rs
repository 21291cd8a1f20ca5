//! Subtitle cues.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

/// A single timed subtitle line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleCue {
    /// 0-based ordinal within the track
    pub index: usize,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub text: String,
    /// User-supplied translation, merged from the translations sidecar
    #[serde(default)]
    pub translation: Option<String>,
}

impl SubtitleCue {
    pub fn new(index: usize, start_time: Timestamp, end_time: Timestamp, text: impl Into<String>) -> Self {
        Self {
            index,
            start_time,
            end_time,
            text: text.into(),
            translation: None,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time).as_millis()
    }

    /// True when the cue intersects `[start, end)`.
    pub fn overlaps(&self, start: Timestamp, end: Timestamp) -> bool {
        self.start_time < end && self.end_time > start
    }
}

/// A `[start, end)` selection inside a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimeRange {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl TimeRange {
    pub fn new(start_time: Timestamp, end_time: Timestamp) -> Self {
        Self { start_time, end_time }
    }

    pub fn is_valid(&self) -> bool {
        self.start_time < self.end_time
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_time.saturating_sub(self.start_time).as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn test_overlap_is_half_open() {
        let cue = SubtitleCue::new(0, ts(1000), ts(2000), "hello");
        assert!(cue.overlaps(ts(1500), ts(3000)));
        assert!(cue.overlaps(ts(0), ts(1001)));
        assert!(!cue.overlaps(ts(2000), ts(3000)));
        assert!(!cue.overlaps(ts(0), ts(1000)));
    }

    #[test]
    fn test_range_validity() {
        assert!(TimeRange::new(ts(0), ts(10)).is_valid());
        assert!(!TimeRange::new(ts(10), ts(10)).is_valid());
        assert_eq!(TimeRange::new(ts(500), ts(2000)).duration_secs(), 1.5);
    }
}
