//! In-process task tracking for background jobs.
//!
//! This crate provides:
//! - A task registry holding `TaskRecord`s polled over HTTP
//! - Progress reporters bound to a single task
//! - Per-output-path locks so two jobs never write the same file
//! - A reaper evicting finished tasks and failing runaway ones

pub mod error;
pub mod locks;
pub mod progress;
pub mod reaper;
pub mod tracker;

pub use error::{QueueError, QueueResult};
pub use locks::{OutputGuard, OutputLocks};
pub use progress::{ProgressFn, TaskProgress};
pub use reaper::{ReaperConfig, TaskReaper};
pub use tracker::{ReapStats, TaskTracker, MAX_RUNTIME_ERROR};
