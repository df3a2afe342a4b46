//! Free-text heuristics applied to model output before it is shown to a
//! learner.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// A run ending in terminators, or the unterminated tail.
static SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]+|[^.!?]+$").expect("valid regex"));

static PRAISE_OPENER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*your response").expect("valid regex"));

static PRAISE_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)keep up|great job").expect("valid regex"));

static TRAILING_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s.!?,;:]+$").expect("valid regex"));

/// Rewrites shorter than this are too thin to show as an example.
const MIN_REWRITE_CHARS: usize = 20;

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Split into trimmed, non-empty sentences.
pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Keep at most `max` sentences of `text`, whitespace collapsed.
pub fn cap_sentences(text: &str, max: usize) -> String {
    let collapsed = collapse_whitespace(text);
    split_sentences(&collapsed)
        .into_iter()
        .take(max)
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when a rewrite suggestion is stock praise rather than an example:
/// opens with "your response", contains "keep up" or "great job", or is
/// under 20 characters.
pub fn is_generic_praise(text: &str) -> bool {
    PRAISE_OPENER.is_match(text)
        || PRAISE_PHRASE.is_match(text)
        || text.trim().chars().count() < MIN_REWRITE_CHARS
}

/// Replace whatever trailing punctuation `text` has with a single period.
pub fn replace_trailing_punctuation(text: &str) -> String {
    let stem = TRAILING_PUNCTUATION.replace(text.trim(), "");
    format!("{}.", stem)
}

/// Append a period unless `text` already ends a sentence.
pub fn terminate_sentence(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() || text.ends_with(['.', '!', '?']) {
        text.to_string()
    } else {
        format!("{}.", text)
    }
}
