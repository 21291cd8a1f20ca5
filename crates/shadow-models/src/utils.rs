//! URL and file name helpers shared by the API and the worker.

use thiserror::Error;
use url::Url;

/// Errors that can occur during YouTube ID extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YoutubeIdError {
    #[error("URL is not a valid YouTube URL")]
    InvalidYoutubeUrl,
    #[error("Video ID has invalid format")]
    InvalidVideoId,
    #[error("Video ID not found in URL")]
    VideoIdNotFound,
}

pub type YoutubeIdResult<T> = Result<T, YoutubeIdError>;

/// Extract the 11-character video ID from a YouTube URL.
///
/// Handles `watch?v=`, `youtu.be/`, `/embed/`, `/v/`, `/shorts/` and `/live/`.
pub fn extract_youtube_id(url: &str) -> YoutubeIdResult<String> {
    let parsed = Url::parse(url.trim()).map_err(|_| YoutubeIdError::InvalidYoutubeUrl)?;
    let host = parsed
        .host_str()
        .map(|h| h.trim_start_matches("www.").trim_start_matches("m.").to_ascii_lowercase())
        .ok_or(YoutubeIdError::InvalidYoutubeUrl)?;

    let candidate = match host.as_str() {
        "youtu.be" => parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string),
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            let from_query = parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned());
            from_query.or_else(|| {
                let segments: Vec<&str> = parsed.path_segments()?.collect();
                match segments.as_slice() {
                    ["embed" | "v" | "shorts" | "live", id, ..] => Some(id.to_string()),
                    _ => None,
                }
            })
        }
        _ => return Err(YoutubeIdError::InvalidYoutubeUrl),
    };

    let id = candidate
        .filter(|s| !s.is_empty())
        .ok_or(YoutubeIdError::VideoIdNotFound)?;
    validate_youtube_id(id)
}

fn validate_youtube_id(id: String) -> YoutubeIdResult<String> {
    let valid_chars = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if id.len() != 11 || !valid_chars {
        return Err(YoutubeIdError::InvalidVideoId);
    }
    Ok(id)
}

/// Turn user input into a safe single-component file stem.
///
/// Path separators and control characters become `_`. Leading dots are
/// dropped so the result can never be `..` or a hidden file.
pub fn sanitize_file_stem(input: &str) -> String {
    let cleaned: String = input
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "output".to_string()
    } else {
        cleaned
    }
}

/// Ensure `name` ends with `.ext` (case-insensitive).
pub fn with_extension(name: &str, ext: &str) -> String {
    let suffix = format!(".{}", ext);
    if name.to_ascii_lowercase().ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}
