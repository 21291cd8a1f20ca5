//! Full-text search over subtitle tracks.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use shadow_models::{SubtitleCue, Timestamp};

use crate::markup::normalize;

/// One searchable subtitle track.
#[derive(Debug, Clone)]
pub struct SearchDocument {
    /// Path of the video the track belongs to
    pub video_path: String,
    /// Display name (video stem)
    pub name: String,
    pub cues: Vec<SubtitleCue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub video_path: String,
    pub name: String,
    pub index: usize,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub text: String,
    /// The query line that produced this hit
    pub query: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MultilineResults {
    pub results: Vec<SearchHit>,
    pub query_results: BTreeMap<String, Vec<SearchHit>>,
}

/// Score a normalized query against normalized cue text.
///
/// Returns `None` when the query is not a substring of the text.
pub fn score_match(query: &str, text: &str) -> Option<f64> {
    if query.is_empty() || !text.contains(query) {
        return None;
    }
    if query == text {
        return Some(1.0);
    }
    let padded_text = format!(" {} ", text);
    let padded_query = format!(" {} ", query);
    if padded_text.contains(&padded_query) {
        return Some(0.9);
    }
    let ratio = query.chars().count() as f64 / text.chars().count().max(1) as f64;
    Some(0.5 + 0.4 * ratio)
}

fn hit_order(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.video_path.cmp(&b.video_path))
        .then_with(|| a.index.cmp(&b.index))
        .then_with(|| a.query.cmp(&b.query))
}

/// Lowercased, trimmed form of a query line. Hits report it and multiline
/// results are keyed by it.
fn query_key(query: &str) -> String {
    query.trim().to_lowercase()
}

fn collect_hits(documents: &[SearchDocument], query: &str) -> Vec<SearchHit> {
    let key = query_key(query);
    let normalized_query = normalize(query);
    if normalized_query.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for doc in documents {
        for cue in &doc.cues {
            if let Some(score) = score_match(&normalized_query, &normalize(&cue.text)) {
                hits.push(SearchHit {
                    video_path: doc.video_path.clone(),
                    name: doc.name.clone(),
                    index: cue.index,
                    start_time: cue.start_time,
                    end_time: cue.end_time,
                    text: cue.text.clone(),
                    query: key.clone(),
                    score,
                });
            }
        }
    }
    hits
}

/// Search every document for `query`.
///
/// Results are ordered by score (descending), video path, then cue index, and
/// truncated to `limit`. The order is total, so identical inputs always give
/// identical output.
pub fn search(documents: &[SearchDocument], query: &str, limit: usize) -> Vec<SearchHit> {
    let mut hits = collect_hits(documents, query);
    hits.sort_by(hit_order);
    hits.truncate(limit);
    hits
}

/// Treat every non-empty line of `query` as its own search.
///
/// `results` merges all lines under the same ordering and limit;
/// `query_results` holds each line's own top `limit` hits.
pub fn search_multiline(documents: &[SearchDocument], query: &str, limit: usize) -> MultilineResults {
    let mut merged = Vec::new();
    let mut per_query = BTreeMap::new();

    for line in query.lines().map(query_key).filter(|l| !l.is_empty()) {
        if per_query.contains_key(&line) {
            continue;
        }
        let mut hits = collect_hits(documents, &line);
        hits.sort_by(hit_order);
        merged.extend(hits.iter().cloned());
        hits.truncate(limit);
        per_query.insert(line, hits);
    }

    merged.sort_by(hit_order);
    merged.truncate(limit);
    MultilineResults {
        results: merged,
        query_results: per_query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str, texts: &[&str]) -> SearchDocument {
        SearchDocument {
            video_path: path.to_string(),
            name: path.trim_end_matches(".mp4").to_string(),
            cues: texts
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    SubtitleCue::new(
                        i,
                        Timestamp::from_millis(i as u64 * 1000),
                        Timestamp::from_millis(i as u64 * 1000 + 900),
                        *t,
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn test_score_rules() {
        assert_eq!(score_match("hello world", "hello world"), Some(1.0));
        assert_eq!(score_match("brain", "the brain is big"), Some(0.9));
        let partial = score_match("brai", "the brain").unwrap();
        assert!((partial - (0.5 + 0.4 * 4.0 / 9.0)).abs() < 1e-9);
        assert_eq!(score_match("xyz", "the brain"), None);
        assert_eq!(score_match("", "the brain"), None);
    }

    #[test]
    fn test_search_orders_and_limits() {
        let docs = vec![
            doc("b.mp4", &["The <i>brain</i>!", "brainstorm later"]),
            doc("a.mp4", &["brain", "my brain hurts"]),
        ];
        let hits = search(&docs, "Brain", 10);
        let keys: Vec<(&str, usize, f64)> =
            hits.iter().map(|h| (h.video_path.as_str(), h.index, h.score)).collect();
        assert_eq!(keys[0], ("a.mp4", 0, 1.0));
        assert_eq!(keys[1], ("a.mp4", 1, 0.9));
        assert_eq!(keys[2], ("b.mp4", 0, 0.9));
        assert_eq!(keys[3].0, "b.mp4");
        assert_eq!(keys[3].1, 1);
        assert_eq!(hits[2].text, "The <i>brain</i>!");

        assert_eq!(search(&docs, "brain", 2).len(), 2);
        assert_eq!(search(&docs, "brain", 10), hits);
        assert!(hits.iter().all(|h| h.query == "brain"));
    }

    #[test]
    fn test_multiline_folds_case() {
        let docs = vec![doc("a.mp4", &["Hello there", "hello again"])];
        let out = search_multiline(&docs, "Hello\n  hello \nHELLO", 10);
        assert_eq!(out.query_results.len(), 1);
        assert_eq!(out.query_results["hello"].len(), 2);
        assert_eq!(out.results.len(), 2);
        assert!(out.results.iter().all(|h| h.query == "hello"));
    }

    #[test]
    fn test_search_multiline() {
        let docs = vec![doc("a.mp4", &["good morning", "good night", "see you"])];
        let out = search_multiline(&docs, "good morning\n\n  see you \n", 10);
        assert_eq!(out.query_results.len(), 2);
        assert_eq!(out.query_results["good morning"].len(), 1);
        assert_eq!(out.query_results["see you"][0].index, 2);
        assert_eq!(out.results.len(), 2);
        assert!(out.results.iter().all(|h| h.score == 1.0));
    }

    #[test]
    fn test_blank_query_matches_nothing() {
        let docs = vec![doc("a.mp4", &["anything"])];
        assert!(search(&docs, " ?! ", 10).is_empty());
    }
}
