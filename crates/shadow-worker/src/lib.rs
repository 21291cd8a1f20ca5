//! Background job runners.
//!
//! This crate provides:
//! - Job definitions for downloads, repeat renders, merges, Whisper and final videos
//! - A bounded executor writing progress and results into the task tracker
//! - Structured per-job logging
//!
//! Jobs run inside the API process; the task registry is in memory.

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod job;
pub mod jobs;
pub mod logging;

pub use config::WorkerConfig;
pub use context::JobContext;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use job::{DownloadJob, FinalVideoJob, MergeJob, RepeatJob, WhisperJob, WorkerJob};
pub use logging::JobLogger;
