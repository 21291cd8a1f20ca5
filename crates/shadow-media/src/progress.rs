//! FFmpeg progress parsing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Calculate progress percentage given total duration in milliseconds.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        self.fraction(total_duration_ms) * 100.0
    }

    /// Fraction of `total_duration_ms` already written, in `[0, 1]`.
    pub fn fraction(&self, total_duration_ms: i64) -> f64 {
        if self.is_complete {
            return 1.0;
        }
        if total_duration_ms <= 0 || self.out_time_ms <= 0 {
            return 0.0;
        }
        (self.out_time_ms as f64 / total_duration_ms as f64).min(1.0)
    }

    /// Estimate time remaining in seconds.
    pub fn eta_seconds(&self, total_duration_ms: i64) -> Option<f64> {
        if self.speed <= 0.0 || self.out_time_ms <= 0 {
            return None;
        }

        let remaining_ms = total_duration_ms - self.out_time_ms;
        if remaining_ms <= 0 {
            return Some(0.0);
        }

        Some((remaining_ms as f64 / 1000.0) / self.speed)
    }
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(FfmpegProgress) + Send + Sync + 'static>;

/// Receives overall job progress in `[0, 1]` with a step description.
pub type StepCallback = Arc<dyn Fn(f64, String) + Send + Sync + 'static>;

/// Step-based progress: `steps_done / total`, refined by the fraction of the
/// running step.
#[derive(Debug, Clone, Copy)]
pub struct StepProgress {
    total: usize,
    done: usize,
}

impl StepProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total: total.max(1),
            done: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn done(&self) -> usize {
        self.done
    }

    /// Mark one step finished and return the overall fraction.
    pub fn finish_step(&mut self) -> f64 {
        self.done = (self.done + 1).min(self.total);
        self.overall(0.0)
    }

    /// Overall fraction while the current step is `within` complete.
    pub fn overall(&self, within: f64) -> f64 {
        let within = if within.is_finite() {
            within.clamp(0.0, 1.0)
        } else {
            0.0
        };
        ((self.done as f64 + within) / self.total as f64).min(1.0)
    }
}
