#![deny(unreachable_patterns)]
//! Media tooling for the shadowing clip studio.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with `-progress pipe:2` parsing
//! - yt-dlp downloads with line-by-line progress events
//! - Repeat video generation (subtitle burn-in, TTS narration, focus cards)
//! - Clip merging, thumbnails and thumbnail-intro final videos
//! - Whisper subtitle generation

pub mod clip;
pub mod command;
pub mod download;
pub mod error;
pub mod filters;
pub mod final_video;
pub mod fs_utils;
pub mod merge;
pub mod probe;
pub mod progress;
pub mod repeat;
pub mod thumbnail;
pub mod tts;
pub mod whisper;

pub use clip::{extract_segment, segment_command};
pub use command::{
    check_edge_tts, check_ffmpeg, check_ffprobe, check_whisper, check_ytdlp, FfmpegCommand,
    FfmpegRunner,
};
pub use download::{download_video, is_supported_url, DownloadEvent, DownloadRequest};
pub use error::{MediaError, MediaResult};
pub use final_video::{
    final_output_name, generate_final_video, FinalVideoOutcome, FinalVideoRequest,
    DEFAULT_INTRO_SECS,
};
pub use merge::{merge_output_name, ClipMerger, MergeOutcome};
pub use probe::{get_duration, probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressCallback, StepCallback, StepProgress};
pub use repeat::{repeat_output_name, RepeatOutcome, RepeatRequest, RepeatVideoGenerator};
pub use thumbnail::{default_thumbnail_name, generate_thumbnail, ThumbnailRequest, ThumbnailTemplate};
pub use tts::{EdgeTtsCli, HttpSpeechSynthesizer, SpeechSynthesizer};
pub use whisper::{estimate_transcription, transcribe, WhisperOutcome, WhisperRequest};
