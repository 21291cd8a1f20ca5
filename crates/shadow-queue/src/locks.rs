//! Per-output-path exclusion.
//!
//! Two jobs writing the same file would race on the final rename. The second
//! caller fails immediately instead of waiting.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{QueueError, QueueResult};

/// Set of output paths currently owned by running jobs.
#[derive(Debug, Clone, Default)]
pub struct OutputLocks {
    held: Arc<Mutex<HashSet<PathBuf>>>,
}

/// Releases its path on drop.
#[derive(Debug)]
pub struct OutputGuard {
    held: Arc<Mutex<HashSet<PathBuf>>>,
    path: PathBuf,
}

impl OutputGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        self.held.lock().remove(&self.path);
        debug!(output = %self.path.display(), "Output lock released");
    }
}

impl OutputLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path`, failing with [`QueueError::OutputBusy`] when taken.
    pub fn acquire(&self, path: impl AsRef<Path>) -> QueueResult<OutputGuard> {
        let key = lock_key(path.as_ref());
        let mut held = self.held.lock();
        if !held.insert(key.clone()) {
            return Err(QueueError::OutputBusy(key));
        }
        debug!(output = %key.display(), "Output lock acquired");
        Ok(OutputGuard {
            held: Arc::clone(&self.held),
            path: key,
        })
    }

    pub fn is_held(&self, path: impl AsRef<Path>) -> bool {
        self.held.lock().contains(&lock_key(path.as_ref()))
    }
}

/// Absolute, lexically normalized form of `path`.
fn lock_key(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let locks = OutputLocks::new();
        let guard = locks.acquire("data/clips_output/a.mp4").unwrap();

        let err = locks.acquire("data/./clips_output/a.mp4").unwrap_err();
        assert!(matches!(err, QueueError::OutputBusy(_)));
        assert!(locks.acquire("data/clips_output/b.mp4").is_ok());

        drop(guard);
        assert!(!locks.is_held("data/clips_output/a.mp4"));
        tokio_test::assert_ok!(locks.acquire("data/clips_output/a.mp4"));
    }

    #[test]
    fn test_lock_key_normalizes() {
        assert_eq!(
            lock_key(Path::new("/data/x/../merged/m.mp4")),
            PathBuf::from("/data/merged/m.mp4")
        );
    }
}
