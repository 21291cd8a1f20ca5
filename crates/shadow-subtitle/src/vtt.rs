//! WebVTT parsing and VTT to SRT conversion.
//!
//! yt-dlp writes auto-generated captions as WebVTT with cue settings, inline
//! karaoke timing tags and rolling duplicate lines. Everything downstream
//! works on SRT, so VTT tracks are converted once and written next to the
//! original.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use shadow_models::{SubtitleCue, Timestamp};
use tracing::{debug, info};

use crate::error::{SubtitleError, SubtitleResult};
use crate::markup::strip_tags;
use crate::srt::to_srt;

static VTT_TIMING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:\d+:)?\d{1,2}:\d{2}[.,]\d{1,3})\s*-->\s*((?:\d+:)?\d{1,2}:\d{2}[.,]\d{1,3})")
        .unwrap()
});

fn parse_vtt_timing(line: &str) -> Option<(Timestamp, Timestamp)> {
    let caps = VTT_TIMING_REGEX.captures(line.trim())?;
    let start: Timestamp = caps[1].parse().ok()?;
    let end: Timestamp = caps[2].parse().ok()?;
    Some((start, end))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn is_metadata_block(first_line: &str) -> bool {
    first_line == "NOTE"
        || first_line.starts_with("NOTE ")
        || first_line.starts_with("NOTE\t")
        || first_line == "STYLE"
        || first_line == "REGION"
}

/// Parse WebVTT content into cues indexed from 0.
///
/// Header, `NOTE`/`STYLE`/`REGION` blocks, cue identifiers and cue settings
/// are dropped. Inline tags are stripped and entities decoded. Consecutive
/// cues with identical text are merged.
pub fn parse_vtt(content: &str) -> SubtitleResult<Vec<SubtitleCue>> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    if !content.trim_start().starts_with("WEBVTT") {
        return Err(SubtitleError::MissingVttHeader);
    }

    let mut cues: Vec<SubtitleCue> = Vec::new();
    let mut skipped_blocks = 0usize;

    // The first block is the header
    for block in content.split("\n\n").skip(1) {
        let lines: Vec<&str> = block.lines().map(str::trim_end).filter(|l| !l.is_empty()).collect();
        let Some(first) = lines.first() else {
            continue;
        };
        if is_metadata_block(first.trim()) {
            skipped_blocks += 1;
            continue;
        }

        let Some(timing_pos) = lines.iter().position(|l| parse_vtt_timing(l).is_some()) else {
            skipped_blocks += 1;
            continue;
        };
        let Some((start, end)) = parse_vtt_timing(lines[timing_pos]) else {
            continue;
        };

        let text = lines[timing_pos + 1..]
            .iter()
            .map(|l| decode_entities(&strip_tags(l)).trim().to_string())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() {
            continue;
        }

        if let Some(prev) = cues.last_mut() {
            if prev.text == text {
                prev.end_time = prev.end_time.max(end);
                continue;
            }
        }
        cues.push(SubtitleCue::new(0, start, end, text));
    }

    if skipped_blocks > 0 {
        debug!(skipped_blocks, "Ignored non-cue WebVTT blocks");
    }

    cues.sort_by_key(|cue| cue.start_time);
    for (i, cue) in cues.iter_mut().enumerate() {
        cue.index = i;
    }
    Ok(cues)
}

/// Convert WebVTT content to SRT text.
pub fn vtt_to_srt(content: &str) -> SubtitleResult<String> {
    Ok(to_srt(&parse_vtt(content)?))
}

/// Convert `name.vtt` to `name.srt` next to it and return the new path.
pub fn convert_vtt_file(vtt_path: &Path) -> SubtitleResult<PathBuf> {
    let content = std::fs::read_to_string(vtt_path).map_err(|e| SubtitleError::read(vtt_path, e))?;
    let srt = vtt_to_srt(&content)?;
    let srt_path = vtt_path.with_extension("srt");
    std::fs::write(&srt_path, srt)?;
    info!(
        vtt = %vtt_path.display(),
        srt = %srt_path.display(),
        "Converted WebVTT subtitle to SRT"
    );
    Ok(srt_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YT_VTT: &str = "WEBVTT\nKind: captions\nLanguage: en\n\nNOTE generated by yt-dlp\n\nSTYLE\n::cue { color: white }\n\n1\n00:00:01.000 --> 00:00:02.500 align:start position:0%\nhello<00:00:01.500><c> world</c>\n\n00:02.500 --> 00:00:04.000\nhello world\n\n00:00:04.000 --> 00:00:05.000\nTom &amp; Jerry\n\n";

    #[test]
    fn test_parse_vtt_strips_settings_and_tags() {
        let cues = parse_vtt(YT_VTT).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "hello world");
        assert_eq!(cues[0].start_time.as_millis(), 1000);
        // duplicate rolling line merged into the first cue
        assert_eq!(cues[0].end_time.as_millis(), 4000);
        assert_eq!(cues[1].text, "Tom & Jerry");
        assert_eq!(cues[1].index, 1);
    }

    #[test]
    fn test_vtt_to_srt_uses_commas() {
        let srt = vtt_to_srt(YT_VTT).unwrap();
        assert!(srt.starts_with("1\n00:00:01,000 --> 00:00:04,000\nhello world\n\n2\n"));
        assert!(!srt.contains("align:"));
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            parse_vtt("1\n00:00:01.000 --> 00:00:02.000\nhi\n"),
            Err(SubtitleError::MissingVttHeader)
        ));
    }

    #[test]
    fn test_convert_vtt_file_writes_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let vtt = dir.path().join("talk.en.vtt");
        std::fs::write(&vtt, YT_VTT).unwrap();
        let srt = convert_vtt_file(&vtt).unwrap();
        assert_eq!(srt, dir.path().join("talk.en.srt"));
        assert!(std::fs::read_to_string(&srt).unwrap().contains("Tom & Jerry"));
    }
}
