//! SRT reading and writing.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use shadow_models::{SubtitleCue, Timestamp};
use tracing::{debug, warn};

use crate::error::{SubtitleError, SubtitleResult};

static TIMING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})")
        .unwrap()
});

/// Parse an SRT timing line into start and end timestamps.
pub(crate) fn parse_timing_line(line: &str) -> Option<(Timestamp, Timestamp)> {
    let caps = TIMING_REGEX.captures(line.trim())?;
    let part = |i: usize| -> u64 { caps[i].parse().unwrap_or(0) };
    // "5" after the separator means 500 ms, not 5 ms
    let millis = |i: usize| -> u64 {
        let raw = &caps[i];
        let value: u64 = raw.parse().unwrap_or(0);
        value * 10u64.pow(3 - raw.len() as u32)
    };
    let start = (part(1) * 3600 + part(2) * 60 + part(3)) * 1000 + millis(4);
    let end = (part(5) * 3600 + part(6) * 60 + part(7)) * 1000 + millis(8);
    Some((Timestamp::from_millis(start), Timestamp::from_millis(end)))
}

/// Parse SRT content into cues.
///
/// Malformed blocks are skipped with a warning. The result is sorted by start
/// time and indexed from 0, so the same file always yields the same indices.
pub fn parse_srt(content: &str) -> Vec<SubtitleCue> {
    let content = content.trim_start_matches('\u{feff}');
    let mut cues = Vec::new();

    let mut timing: Option<(Timestamp, Timestamp)> = None;
    let mut text = String::new();
    let mut awaiting_timing = true;

    let mut flush = |timing: &mut Option<(Timestamp, Timestamp)>, text: &mut String| {
        if let Some((start, end)) = timing.take() {
            let body = text.trim();
            if body.is_empty() {
                debug!(start = %start, "Skipping empty subtitle cue");
            } else if end < start {
                warn!(start = %start, end = %end, "Skipping cue that ends before it starts");
            } else {
                cues.push(SubtitleCue::new(0, start, end, body));
            }
        }
        text.clear();
    };

    for (line_no, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if timing.is_some() {
                flush(&mut timing, &mut text);
                awaiting_timing = true;
            }
            continue;
        }

        if awaiting_timing {
            if let Some(pair) = parse_timing_line(trimmed) {
                timing = Some(pair);
                awaiting_timing = false;
                continue;
            }
            // Sequence numbers precede the timing line and carry no information
            if trimmed.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            warn!(line = line_no + 1, text = %trimmed, "Unexpected text before timing line");
            continue;
        }

        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(trimmed);
    }
    flush(&mut timing, &mut text);

    cues.sort_by_key(|cue| cue.start_time);
    for (i, cue) in cues.iter_mut().enumerate() {
        cue.index = i;
    }
    cues
}

/// Read and parse an SRT file.
pub fn read_srt(path: &Path) -> SubtitleResult<Vec<SubtitleCue>> {
    let content = std::fs::read_to_string(path).map_err(|e| SubtitleError::read(path, e))?;
    Ok(parse_srt(&content))
}

/// Render cues as SRT, numbering from 1.
pub fn to_srt(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            cue.start_time,
            cue.end_time,
            cue.text
        );
    }
    out
}

/// Cues overlapping `[start, end)`, clipped to the range and shifted so the
/// range starts at zero.
pub fn slice_for_range(cues: &[SubtitleCue], start: Timestamp, end: Timestamp) -> Vec<SubtitleCue> {
    cues.iter()
        .filter(|cue| cue.overlaps(start, end))
        .enumerate()
        .map(|(i, cue)| {
            let clipped_start = cue.start_time.max(start);
            let clipped_end = cue.end_time.min(end);
            SubtitleCue {
                index: i,
                start_time: clipped_start.saturating_sub(start),
                end_time: clipped_end.saturating_sub(start),
                text: cue.text.clone(),
                translation: cue.translation.clone(),
            }
        })
        .collect()
}
