//! Shared data models for the shadowing clip studio.
//!
//! This crate provides Serde-serializable types for:
//! - Background task records and their lifecycle
//! - Subtitle cues and millisecond timestamps
//! - Clip listings
//! - Repeat video generation settings
//! - The Whisper model catalogue

pub mod clip;
pub mod cue;
pub mod generation;
pub mod task;
pub mod timestamp;
pub mod utils;
pub mod whisper;

pub use clip::VideoClip;
pub use cue::{SubtitleCue, TimeRange};
pub use generation::{
    estimate_generation_secs, GenerationConfig, SubtitleMode, SubtitleStyle, TtsConfig,
    TtsProvider, FOCUS_CARD_MESSAGES, FOCUS_CARD_SECS, MAX_REPEAT_COUNT,
};
pub use task::{TaskId, TaskKind, TaskRecord, TaskStatus};
pub use timestamp::{parse_timestamp, Timestamp, TimestampError};
pub use utils::{extract_youtube_id, sanitize_file_stem, with_extension, YoutubeIdError};
pub use whisper::{WhisperEstimate, WhisperModel};
