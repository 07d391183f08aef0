use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Render-ready payload pushed to a live session when a message passes the
/// session's filters. Content is already linkified; `parent_id` tells the
/// client to insert the fragment under the parent node instead of prepending
/// to the top-level stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FeedFragment {
    /// Id of the rendered message.
    pub message_id: i64,
    /// Linkified HTML content.
    pub content: String,
    /// Clock-style display time (`%H:%M`).
    pub created_at: String,
    /// Full ISO 8601 timestamp for client-side timezone handling.
    pub created_at_iso: String,
    /// Author email.
    pub author: String,
    /// Author user id.
    pub author_id: i64,
    /// Placement target: present for replies, absent for top-level posts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

/// One node of an assembled conversation tree, returned by the pull surface
/// (thread view and feed listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FeedItem {
    /// Message id.
    pub id: i64,
    /// Linkified HTML content.
    pub content: String,
    /// Clock-style display time (`%H:%M`).
    pub created_at: String,
    /// Full ISO 8601 timestamp.
    pub created_at_iso: String,
    /// Author email.
    pub author: String,
    /// Author user id.
    pub author_id: i64,
    /// Star status for the requesting viewer; absent when anonymous.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_starred: Option<bool>,
    /// Set only on the node the caller originally asked for.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_focused: bool,
    /// Replies, eagerly loaded to the assembler's fixed depth.
    #[schema(no_recursion)]
    pub replies: Vec<FeedItem>,
}

/// One page of the feed listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FeedPage {
    /// Messages on this page, newest first.
    pub items: Vec<FeedItem>,
    /// Cursor for the next page; absent when the page came up short.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<i64>,
}

/// A hashtag with its lifetime usage count, as shown in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HashtagEntry {
    /// Tag name without the leading `#`.
    pub tag: String,
    /// Lifetime usage count.
    pub count: i64,
}

/// Viewer-supplied filters for feed listing queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    /// Selected hashtags; a message matches when it contains any of them.
    pub tags: Vec<String>,
    /// Case-insensitive substring filter.
    pub search: Option<String>,
    /// Restrict to top-level posts (the "threaded" view).
    pub top_level_only: bool,
}

impl FeedFilter {
    /// True when no filter dimension is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.search.is_none() && !self.top_level_only
    }
}
