//! Inline markup handling for cue text.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Remove `<i>`, `<font ...>`, `<c.color>`, `<00:00:01.000>` and similar tags.
pub fn strip_tags(text: &str) -> String {
    TAG_REGEX.replace_all(text, "").into_owned()
}

/// Normalize text for matching: tags stripped, lowercase, punctuation removed,
/// whitespace collapsed.
pub fn normalize(text: &str) -> String {
    let stripped = strip_tags(text).to_lowercase();
    let without_punct: String = stripped
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() || c == '\'' { c } else { ' ' })
        .filter(|c| *c != '\'')
        .collect();
    WHITESPACE_REGEX
        .replace_all(without_punct.trim(), " ")
        .into_owned()
}

/// Wrap every case-insensitive occurrence of `phrase` in a `<font color>` tag.
///
/// The matched text keeps its original casing.
pub fn highlight_phrase(text: &str, phrase: &str, color: &str) -> String {
    let phrase = phrase.trim();
    if phrase.is_empty() {
        return text.to_string();
    }
    let pattern = match RegexBuilder::new(&regex::escape(phrase))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re,
        Err(_) => return text.to_string(),
    };
    pattern
        .replace_all(text, |caps: &regex::Captures| {
            format!("<font color=\"{}\">{}</font>", color, &caps[0])
        })
        .into_owned()
}
