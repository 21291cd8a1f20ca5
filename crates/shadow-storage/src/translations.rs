//! Per-video translation sidecars.
//!
//! Translations live next to the video as `<stem>.translations.json`, a flat
//! object keyed by cue index: `{"0": "안녕하세요", "3": "..."}`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use shadow_models::SubtitleCue;
use tracing::{info, warn};

use crate::error::{StorageError, StorageResult};

/// Cue index to translated text.
pub type Translations = BTreeMap<usize, String>;

/// Sidecar path for a video.
pub fn translations_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    video.with_file_name(format!("{}.translations.json", stem))
}

/// Read the sidecar. A missing file is an empty map; a malformed one is an error.
pub fn read_translations(video: &Path) -> StorageResult<Translations> {
    let path = translations_path(video);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Translations::new()),
        Err(e) => return Err(e.into()),
    };
    let map: BTreeMap<String, String> =
        serde_json::from_str(&raw).map_err(|e| StorageError::MalformedSidecar {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
        .collect())
}

/// Load saved translations for display. A missing or unreadable sidecar
/// yields an empty map.
pub fn load_translations(video: &Path) -> Translations {
    read_translations(video).unwrap_or_else(|e| {
        warn!(video = %video.display(), error = %e, "Ignoring unreadable translations file");
        Translations::new()
    })
}

/// Copy saved translations onto cues by index.
pub fn apply_translations(cues: &mut [SubtitleCue], translations: &Translations) {
    for cue in cues.iter_mut() {
        if let Some(text) = translations.get(&cue.index) {
            cue.translation = Some(text.clone());
        }
    }
}

/// Serializes sidecar writes across the process.
#[derive(Debug, Default)]
pub struct TranslationStore {
    write_lock: Mutex<()>,
}

impl TranslationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save the translation for cue `index` of a track with `cue_count` cues.
    ///
    /// The sidecar is rewritten through a temp file in the same directory and
    /// renamed into place, so readers never observe a partial file. A sidecar
    /// that no longer parses is left untouched and reported.
    pub fn save(
        &self,
        video: &Path,
        index: usize,
        cue_count: usize,
        translation: &str,
    ) -> StorageResult<Translations> {
        if index >= cue_count {
            return Err(StorageError::IndexOutOfRange {
                index,
                count: cue_count,
            });
        }

        let _guard = self.write_lock.lock();

        let mut translations = read_translations(video)?;
        translations.insert(index, translation.to_string());

        let on_disk: BTreeMap<String, &String> =
            translations.iter().map(|(k, v)| (k.to_string(), v)).collect();
        let json = serde_json::to_vec_pretty(&on_disk)?;

        let path = translations_path(video);
        let dir = path.parent().unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| StorageError::PersistFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        info!(
            video = %video.display(),
            index,
            total = translations.len(),
            "Saved subtitle translation"
        );
        Ok(translations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_translations_path() {
        assert_eq!(
            translations_path(Path::new("data/clips/talk.mp4")),
            PathBuf::from("data/clips/talk.translations.json")
        );
    }

    #[test]
    fn test_save_only_touches_one_index() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.mp4");
        let store = TranslationStore::new();

        store.save(&video, 0, 3, "첫 번째").unwrap();
        store.save(&video, 2, 3, "세 번째").unwrap();
        let saved = store.save(&video, 0, 3, "처음").unwrap();

        assert_eq!(saved.len(), 2);
        assert_eq!(saved[&0], "처음");
        assert_eq!(load_translations(&video)[&2], "세 번째");

        let raw = std::fs::read_to_string(translations_path(&video)).unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["2"], "세 번째");
    }

    #[test]
    fn test_save_rejects_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranslationStore::new();
        let err = store.save(&dir.path().join("v.mp4"), 3, 3, "x").unwrap_err();
        assert!(matches!(err, StorageError::IndexOutOfRange { index: 3, count: 3 }));
    }

    #[test]
    fn test_malformed_sidecar_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("v.mp4");
        let path = translations_path(&video);
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_translations(&video).is_empty());

        let err = TranslationStore::new().save(&video, 1, 2, "ok").unwrap_err();
        assert!(matches!(err, StorageError::MalformedSidecar { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn test_read_missing_sidecar_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_translations(&dir.path().join("v.mp4")).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_saves_keep_every_index() {
        let dir = tempfile::tempdir().unwrap();
        let video = Arc::new(dir.path().join("v.mp4"));
        let store = Arc::new(TranslationStore::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let video = Arc::clone(&video);
                std::thread::spawn(move || store.save(&video, i, 8, &format!("t{}", i)).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(load_translations(&video).len(), 8);
    }
}
