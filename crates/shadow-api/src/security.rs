//! Input validation for user-supplied URLs and text.

use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::warn;
use url::Url;

use shadow_media::is_supported_url;

/// Maximum URL length accepted for downloads.
const MAX_URL_LENGTH: usize = 2048;

/// Maximum length of a search query or translation.
pub const MAX_TEXT_LENGTH: usize = 5000;

/// Internal hosts yt-dlp must never be pointed at.
static BLOCKED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^https?://127\.").unwrap(),
        Regex::new(r"^https?://localhost").unwrap(),
        Regex::new(r"^https?://10\.").unwrap(),
        Regex::new(r"^https?://172\.(1[6-9]|2[0-9]|3[0-1])\.").unwrap(),
        Regex::new(r"^https?://192\.168\.").unwrap(),
        Regex::new(r"^https?://169\.254\.").unwrap(),
        Regex::new(r"^https?://\[::1\]").unwrap(),
        Regex::new(r"^https?://metadata\.").unwrap(),
    ]
});

/// Result of URL validation.
#[derive(Debug)]
pub enum UrlValidationResult {
    Valid(String),
    /// Malformed or not http(s)
    Invalid(String),
    /// Host is not a supported video platform
    DomainNotAllowed(String),
    /// Targets an internal endpoint
    Blocked,
    TooLong,
}

impl UrlValidationResult {
    pub fn into_result(self) -> Result<String, String> {
        match self {
            Self::Valid(url) => Ok(url),
            Self::Invalid(msg) => Err(msg),
            Self::DomainNotAllowed(domain) => Err(format!(
                "Unsupported video URL host '{}'. Use a YouTube link or another supported platform.",
                domain
            )),
            Self::Blocked => Err("URL appears to target an internal or restricted endpoint".to_string()),
            Self::TooLong => Err(format!("URL exceeds maximum length of {} characters", MAX_URL_LENGTH)),
        }
    }
}

/// Validate a download URL.
pub fn validate_video_url(url: &str) -> UrlValidationResult {
    if url.len() > MAX_URL_LENGTH {
        return UrlValidationResult::TooLong;
    }

    let url = url.trim();
    if url.is_empty() {
        return UrlValidationResult::Invalid("URL cannot be empty".to_string());
    }

    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => return UrlValidationResult::Invalid(format!("Invalid URL format: {}", e)),
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return UrlValidationResult::Invalid(format!(
                "Invalid protocol '{}'. Only HTTP and HTTPS are allowed.",
                scheme
            ))
        }
    }

    if BLOCKED_PATTERNS.iter().any(|p| p.is_match(url)) {
        warn!(url = %url, "Blocked URL pattern detected");
        return UrlValidationResult::Blocked;
    }

    let Some(domain) = parsed.host_str().map(str::to_lowercase) else {
        return UrlValidationResult::Invalid("URL must have a valid domain".to_string());
    };

    if !is_supported_url(url) {
        return UrlValidationResult::DomainNotAllowed(domain);
    }

    UrlValidationResult::Valid(url.to_string())
}

/// Strip control characters (except newline and tab) and cap the length.
pub fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .take(MAX_TEXT_LENGTH)
        .collect()
}
