//! HTTP handlers for the feed surface.

pub mod feed;
pub mod hashtags;
pub mod streaming;
pub mod thread;

/// Split a comma-separated `tags` query value into clean tag names.
pub(crate) fn parse_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(|tag| tag.trim_start_matches('#').to_string())
            .collect()
    })
    .unwrap_or_default()
}
