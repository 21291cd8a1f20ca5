//! Subtitle error types.

use std::path::PathBuf;

use thiserror::Error;

pub type SubtitleResult<T> = Result<T, SubtitleError>;

#[derive(Debug, Error)]
pub enum SubtitleError {
    #[error("Not a WebVTT document (missing WEBVTT header)")]
    MissingVttHeader,

    #[error("Cue index {index} out of range (track has {count} cues)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Failed to read subtitle file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SubtitleError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}
