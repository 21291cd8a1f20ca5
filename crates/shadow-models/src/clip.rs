//! Downloaded clip listing entries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A video file in the clips library, built from disk at listing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideoClip {
    /// File name including extension
    pub name: String,
    /// Path relative to the data root's parent, using `/` separators
    pub path: String,
    /// Absolute path on disk
    pub full_path: String,
    /// Size in bytes
    pub size: u64,
    /// Modification time, RFC3339
    pub modified: String,
    /// Modification time, `%Y-%m-%d %H:%M:%S` (local)
    pub modified_str: String,
    pub has_subtitle: bool,
    /// Language codes with a subtitle file next to the video. `default` marks an
    /// un-suffixed `.srt`/`.vtt`.
    pub available_subtitles: Vec<String>,
}
