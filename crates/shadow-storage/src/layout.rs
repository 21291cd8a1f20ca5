//! On-disk directory layout and path resolution.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Video container extensions that may be streamed.
pub const STREAMABLE_EXTENSIONS: [&str; 4] = ["mp4", "webm", "mkv", "avi"];

/// Directory layout under the data root.
///
/// ```text
/// data/
///   clips/              downloaded videos and their subtitles
///   clips/thumbnails/   generated thumbnails
///   clips_output/       repeat and final videos
///   merged_clips/       merged videos
///   subtitles/
///   temp/
///   logs/
/// ```
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.root.join("clips")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("clips_output")
    }

    pub fn merged_dir(&self) -> PathBuf {
        self.root.join("merged_clips")
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.clips_dir().join("thumbnails")
    }

    pub fn subtitles_dir(&self) -> PathBuf {
        self.root.join("subtitles")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    fn all_dirs(&self) -> [PathBuf; 7] {
        [
            self.clips_dir(),
            self.output_dir(),
            self.merged_dir(),
            self.thumbnails_dir(),
            self.subtitles_dir(),
            self.temp_dir(),
            self.logs_dir(),
        ]
    }

    /// Create every directory of the layout.
    pub fn ensure_directories(&self) -> StorageResult<()> {
        for dir in self.all_dirs() {
            std::fs::create_dir_all(&dir)?;
        }
        info!(root = %self.root.display(), "Data directories ready");
        Ok(())
    }

    /// Check that the data root accepts writes.
    pub async fn is_writable(&self) -> bool {
        let probe = self.temp_dir().join(".write_probe");
        match tokio::fs::write(&probe, b"ok").await {
            Ok(()) => {
                let _ = tokio::fs::remove_file(&probe).await;
                true
            }
            Err(_) => false,
        }
    }

    /// Map a user-supplied path to a location on disk.
    ///
    /// Absolute and already-existing paths are kept. Paths starting with the
    /// data root are taken as-is, `clips/...` is placed under the root, and a
    /// bare name is looked up in the clips directory.
    pub fn standardize_path(&self, raw: &str) -> PathBuf {
        let path = PathBuf::from(raw);
        if path.is_absolute() || path.exists() {
            return path;
        }
        let resolved = if path.starts_with(&self.root) {
            path
        } else if path.starts_with("clips") {
            self.root.join(path)
        } else {
            self.clips_dir().join(path)
        };
        debug!(raw = %raw, resolved = %resolved.display(), "Standardized path");
        resolved
    }

    /// Standardize `raw` and require an existing file.
    pub fn require_file(&self, raw: &str) -> StorageResult<PathBuf> {
        if raw.trim().is_empty() {
            return Err(StorageError::invalid_path("path must not be empty"));
        }
        reject_traversal(raw)?;
        let path = self.standardize_path(raw.trim());
        if path.is_file() {
            Ok(path)
        } else {
            Err(StorageError::not_found(raw))
        }
    }

    /// Resolve a streaming request path.
    ///
    /// Looks in the output dir, the clips dir and the merged dir by file name,
    /// then falls back to the standardized path.
    pub fn resolve_stream_path(&self, raw: &str) -> StorageResult<PathBuf> {
        reject_traversal(raw)?;
        let requested = Path::new(raw);

        let extension = requested
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !STREAMABLE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(StorageError::unsupported_format(raw));
        }

        let file_name = requested
            .file_name()
            .ok_or_else(|| StorageError::invalid_path(raw))?;

        let candidates = [
            self.output_dir().join(file_name),
            self.clips_dir().join(file_name),
            self.merged_dir().join(file_name),
            self.standardize_path(raw),
        ];
        candidates
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| StorageError::not_found(raw))
    }

    /// Path relative to the data root's parent with `/` separators, or the
    /// full path when it lies outside the root.
    pub fn display_path(&self, path: &Path) -> String {
        let base = self.root.parent().unwrap_or(Path::new(""));
        let relative = if base.as_os_str().is_empty() {
            path
        } else {
            match path.strip_prefix(base) {
                Ok(rel) => rel,
                Err(_) => return path.to_string_lossy().into_owned(),
            }
        };
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn reject_traversal(raw: &str) -> StorageResult<()> {
    if Path::new(raw)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(StorageError::invalid_path(format!(
            "path traversal is not allowed: {}",
            raw
        )));
    }
    Ok(())
}
