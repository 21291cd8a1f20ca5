//! The clips library: listing videos, finding their subtitles and building
//! search documents.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use shadow_models::{SubtitleCue, VideoClip};
use shadow_subtitle::{convert_vtt_file, read_srt, SearchDocument};
use tracing::{debug, info, warn};

use crate::error::StorageResult;
use crate::layout::StorageLayout;
use crate::translations::{apply_translations, load_translations};

/// Language codes probed when no (or no matching) language is requested.
pub const SUBTITLE_LANGUAGES: [&str; 10] = [
    "en", "en-US", "en-GB", "ko", "ja", "zh-CN", "zh-TW", "fr", "de", "es",
];

/// Label used for an un-suffixed `video.srt` / `video.vtt`.
pub const DEFAULT_SUBTITLE_LABEL: &str = "default";

fn sibling(video: &Path, suffix: &str) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    video.with_file_name(format!("{}{}", stem, suffix))
}

/// Subtitle languages present next to `video`.
pub fn available_subtitles(video: &Path) -> Vec<String> {
    let mut found = Vec::new();
    if sibling(video, ".srt").is_file() || sibling(video, ".vtt").is_file() {
        found.push(DEFAULT_SUBTITLE_LABEL.to_string());
    }
    for lang in SUBTITLE_LANGUAGES {
        let srt = sibling(video, &format!(".{}.srt", lang));
        let vtt = sibling(video, &format!(".{}.vtt", lang));
        if srt.is_file() || vtt.is_file() {
            found.push(lang.to_string());
        }
    }
    found
}

/// `video.<lang>.srt`, else `video.<lang>.vtt` converted in place.
fn find_for_language(video: &Path, lang: &str) -> StorageResult<Option<PathBuf>> {
    let srt = sibling(video, &format!(".{}.srt", lang));
    if srt.is_file() {
        return Ok(Some(srt));
    }
    let vtt = sibling(video, &format!(".{}.vtt", lang));
    if vtt.is_file() {
        return Ok(Some(convert_vtt_file(&vtt)?));
    }
    Ok(None)
}

/// Locate the SRT track for `video`, converting WebVTT to SRT on disk when
/// only a `.vtt` exists.
///
/// Priority: requested language, then each of [`SUBTITLE_LANGUAGES`], then an
/// un-suffixed track.
pub fn find_subtitle_file(video: &Path, language: Option<&str>) -> StorageResult<Option<PathBuf>> {
    if let Some(lang) = language.map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(path) = find_for_language(video, lang)? {
            return Ok(Some(path));
        }
    }
    for lang in SUBTITLE_LANGUAGES {
        if let Some(path) = find_for_language(video, lang)? {
            return Ok(Some(path));
        }
    }
    let srt = sibling(video, ".srt");
    if srt.is_file() {
        return Ok(Some(srt));
    }
    let vtt = sibling(video, ".vtt");
    if vtt.is_file() {
        return Ok(Some(convert_vtt_file(&vtt)?));
    }
    Ok(None)
}

/// A resolved subtitle track with translations applied.
#[derive(Debug, Clone)]
pub struct LoadedSubtitles {
    pub subtitle_path: PathBuf,
    pub cues: Vec<SubtitleCue>,
}

/// Load the cues for `video` merged with saved translations.
pub fn load_cues(video: &Path, language: Option<&str>) -> StorageResult<Option<LoadedSubtitles>> {
    let Some(subtitle_path) = find_subtitle_file(video, language)? else {
        return Ok(None);
    };
    let mut cues = read_srt(&subtitle_path)?;
    apply_translations(&mut cues, &load_translations(video));
    debug!(
        subtitle = %subtitle_path.display(),
        cues = cues.len(),
        "Loaded subtitle cues"
    );
    Ok(Some(LoadedSubtitles { subtitle_path, cues }))
}

/// List every `.mp4` in the clips directory, newest first.
///
/// A missing directory yields an empty list. Files that cannot be inspected
/// are skipped with a warning.
pub async fn list_clips(layout: &StorageLayout) -> StorageResult<Vec<VideoClip>> {
    let clips_dir = layout.clips_dir();
    let mut entries = match tokio::fs::read_dir(&clips_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(dir = %clips_dir.display(), "Clips directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut clips: Vec<(i64, VideoClip)> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_mp4 = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("mp4"))
            .unwrap_or(false);
        if !is_mp4 {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable clip");
                continue;
            }
        };

        let modified: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let available = available_subtitles(&path);
        let full_path = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());

        clips.push((
            modified.timestamp_millis(),
            VideoClip {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: layout.display_path(&path),
                full_path: full_path.to_string_lossy().into_owned(),
                size: metadata.len(),
                modified: modified.to_rfc3339(),
                modified_str: modified
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                has_subtitle: !available.is_empty(),
                available_subtitles: available,
            },
        ));
    }

    clips.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));
    info!(count = clips.len(), "Listed clips");
    Ok(clips.into_iter().map(|(_, clip)| clip).collect())
}

/// Strip a trailing `.<lang>` from a subtitle stem.
fn video_stem_of(subtitle_stem: &str) -> &str {
    for lang in SUBTITLE_LANGUAGES {
        if let Some(base) = subtitle_stem.strip_suffix(&format!(".{}", lang)) {
            return base;
        }
    }
    subtitle_stem
}

/// Build search documents from every SRT in the clips directory except
/// Korean tracks. Files are visited in name order.
pub fn search_documents(layout: &StorageLayout) -> StorageResult<Vec<SearchDocument>> {
    let clips_dir = layout.clips_dir();
    let read_dir = match std::fs::read_dir(&clips_dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut subtitle_files: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            name.ends_with(".srt") && !name.ends_with(".ko.srt")
        })
        .collect();
    subtitle_files.sort();

    let mut documents = Vec::with_capacity(subtitle_files.len());
    for path in subtitle_files {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = video_stem_of(&stem).to_string();
        let video_path = clips_dir.join(format!("{}.mp4", name));

        match read_srt(&path) {
            Ok(cues) => documents.push(SearchDocument {
                video_path: layout.display_path(&video_path),
                name,
                cues,
            }),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable subtitle"),
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRT: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nWorld\n\n";
    const VTT: &str = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nFrom vtt\n\n";

    fn setup() -> (tempfile::TempDir, StorageLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("data"));
        layout.ensure_directories().unwrap();
        (dir, layout)
    }

    #[test]
    fn test_subtitle_priority() {
        let (_dir, layout) = setup();
        let video = layout.clips_dir().join("talk.mp4");
        std::fs::write(&video, b"v").unwrap();

        assert!(find_subtitle_file(&video, None).unwrap().is_none());

        std::fs::write(layout.clips_dir().join("talk.srt"), SRT).unwrap();
        assert_eq!(
            find_subtitle_file(&video, Some("en")).unwrap().unwrap(),
            layout.clips_dir().join("talk.srt")
        );

        std::fs::write(layout.clips_dir().join("talk.ko.vtt"), VTT).unwrap();
        let found = find_subtitle_file(&video, None).unwrap().unwrap();
        assert_eq!(found, layout.clips_dir().join("talk.ko.srt"));
        assert!(found.is_file());

        std::fs::write(layout.clips_dir().join("talk.en.srt"), SRT).unwrap();
        assert_eq!(
            find_subtitle_file(&video, None).unwrap().unwrap(),
            layout.clips_dir().join("talk.en.srt")
        );
        assert_eq!(
            find_subtitle_file(&video, Some("ko")).unwrap().unwrap(),
            layout.clips_dir().join("talk.ko.srt")
        );
    }

    #[test]
    fn test_available_subtitles() {
        let (_dir, layout) = setup();
        let video = layout.clips_dir().join("talk.mp4");
        std::fs::write(layout.clips_dir().join("talk.vtt"), VTT).unwrap();
        std::fs::write(layout.clips_dir().join("talk.en-US.srt"), SRT).unwrap();
        std::fs::write(layout.clips_dir().join("talk.ko.vtt"), VTT).unwrap();
        assert_eq!(available_subtitles(&video), vec!["default", "en-US", "ko"]);
    }

    #[test]
    fn test_load_cues_merges_translations() {
        let (_dir, layout) = setup();
        let video = layout.clips_dir().join("talk.mp4");
        std::fs::write(&video, b"v").unwrap();
        std::fs::write(layout.clips_dir().join("talk.en.srt"), SRT).unwrap();
        crate::TranslationStore::new().save(&video, 1, 2, "세계").unwrap();

        let loaded = load_cues(&video, None).unwrap().unwrap();
        assert_eq!(loaded.cues.len(), 2);
        assert_eq!(loaded.cues[0].translation, None);
        assert_eq!(loaded.cues[1].translation.as_deref(), Some("세계"));
    }

    #[tokio::test]
    async fn test_list_clips() {
        let (_dir, layout) = setup();
        std::fs::write(layout.clips_dir().join("a.mp4"), b"aaaa").unwrap();
        std::fs::write(layout.clips_dir().join("a.en.srt"), SRT).unwrap();
        std::fs::write(layout.clips_dir().join("notes.txt"), b"n").unwrap();

        let clips = list_clips(&layout).await.unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].name, "a.mp4");
        assert_eq!(clips[0].path, "data/clips/a.mp4");
        assert_eq!(clips[0].size, 4);
        assert!(clips[0].has_subtitle);
        assert_eq!(clips[0].available_subtitles, vec!["en"]);
    }

    #[tokio::test]
    async fn test_list_clips_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("nothing"));
        assert!(list_clips(&layout).await.unwrap().is_empty());
    }

    #[test]
    fn test_search_documents_skip_korean() {
        let (_dir, layout) = setup();
        std::fs::write(layout.clips_dir().join("b.en.srt"), SRT).unwrap();
        std::fs::write(layout.clips_dir().join("b.ko.srt"), SRT).unwrap();
        std::fs::write(layout.clips_dir().join("a.srt"), SRT).unwrap();

        let docs = search_documents(&layout).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(docs[1].video_path, "data/clips/b.mp4");
        assert_eq!(docs[1].cues.len(), 2);
    }
}
