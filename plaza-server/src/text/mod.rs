//! Text analysis for message content: hashtag/term extraction, the weighted
//! length rule, and linkified rendering.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Maximum display length for a shortened URL inside an anchor.
const URL_DISPLAY_LEN: usize = 30;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("valid regex"));
static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").expect("valid regex"));
static LINK_OR_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://\S+)|(#\w+)").expect("valid regex"));
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("valid regex"));
static PROTOCOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://").expect("valid regex"));

/// Common English words carrying no search signal.
static STOP_WORDS: &[&str] = &[
    "the", "be", "to", "of", "and", "a", "in", "that", "have", "i", "it", "for", "not", "on",
    "with", "he", "as", "you", "do", "at", "this", "but", "his", "by", "from", "they", "we", "say",
    "her", "she", "or", "an", "will", "my", "one", "all", "would", "there", "their", "what", "so",
    "up", "out", "if", "about", "who", "get", "which", "go", "me", "when", "make", "can", "like",
    "time", "no", "just", "him", "know", "take", "people", "into", "year", "your", "good", "some",
    "could", "them", "see", "other", "than", "then", "now", "look", "only", "come", "its", "over",
    "think", "also", "back", "after", "use", "two", "how", "our", "work", "first", "well", "way",
    "even", "new", "want", "because", "any", "these", "give", "day", "most", "us", "is", "are",
    "was", "were", "has", "had",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Extract the distinct hashtags in `text`, without the leading `#`.
#[must_use]
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let set: BTreeSet<String> = HASHTAG_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect();
    set.into_iter().collect()
}

/// Extract significant search terms from `text`: URLs and hashtags are
/// stripped first (they are indexed separately), remaining word tokens are
/// lowercased, and anything short or on the stop list is discarded.
#[must_use]
pub fn extract_terms(text: &str) -> Vec<String> {
    let stripped = LINK_OR_TAG_RE.replace_all(text, "");
    let set: BTreeSet<String> = WORD_RE
        .find_iter(&stripped.to_lowercase())
        .map(|token| token.as_str().to_string())
        .filter(|word| word.chars().count() > 2 && !is_stop_word(word))
        .collect();
    set.into_iter().collect()
}

/// Character length of `text` where each URL weighs a single character.
#[must_use]
pub fn weighted_length(text: &str) -> usize {
    let url_count = URL_RE.find_iter(text).count();
    let without_urls = URL_RE.replace_all(text, "");
    without_urls.chars().count() + url_count
}

fn shorten_url(url: &str) -> String {
    let short = PROTOCOL_RE.replace(url, "");
    if short.chars().count() > URL_DISPLAY_LEN {
        let truncated: String = short.chars().take(URL_DISPLAY_LEN - 3).collect();
        format!("{truncated}...")
    } else {
        short.into_owned()
    }
}

/// Replace URLs and hashtags in `text` with clickable anchors: URLs open in a
/// new tab with a display-shortened label, hashtags toggle the sidebar filter.
#[must_use]
pub fn linkify(text: &str) -> String {
    LINK_OR_TAG_RE
        .replace_all(text, |caps: &Captures<'_>| {
            if let Some(url) = caps.get(1) {
                let url = url.as_str();
                let display = shorten_url(url);
                format!(
                    "<a href=\"{url}\" target=\"_blank\" rel=\"noopener noreferrer\" \
                     class=\"text-blue-500 hover:underline\" \
                     onclick=\"event.stopPropagation()\">{display}</a>"
                )
            } else {
                let hashtag = &caps[2];
                let tag = &hashtag[1..];
                format!(
                    "<a href=\"#\" onclick=\"toggleHashtag('{tag}'); return false;\" \
                     class=\"hashtag text-blue-500 hover:underline\">{hashtag}</a>"
                )
            }
        })
        .into_owned()
}

/// `%H:%M` display form of a timestamp.
#[must_use]
pub fn format_clock(ts: &DateTime<Utc>) -> String {
    ts.format("%H:%M").to_string()
}

/// ISO 8601 form of a timestamp, seconds precision.
#[must_use]
pub fn format_iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
