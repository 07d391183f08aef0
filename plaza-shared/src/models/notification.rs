use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::FeedEvent;

/// Maximum number of characters of message content quoted in a reply
/// notification body.
const EXCERPT_LEN: usize = 50;

/// Classification of a derived notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone replied to a message the viewer wrote.
    NewReply,
    /// A new top-level post appeared in the square.
    NewMessage,
}

/// A notification derived per live session per event; computed fresh on each
/// delivery and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NotificationIntent {
    /// What kind of activity triggered the notification.
    pub kind: NotificationKind,
    /// Short heading for the client notification UI.
    pub title: String,
    /// Summary line, including author and (for replies) an excerpt.
    pub body: String,
}

impl NotificationIntent {
    /// Reply-to-me notification for the parent's author.
    #[must_use]
    pub fn new_reply(event: &FeedEvent) -> Self {
        let mut excerpt: String = event.content.chars().take(EXCERPT_LEN).collect();
        if event.content.chars().count() > EXCERPT_LEN {
            excerpt.push_str("...");
        }
        Self {
            kind: NotificationKind::NewReply,
            title: "New Reply".into(),
            body: format!("New reply from {}: {excerpt}", event.author),
        }
    }

    /// New top-level post notification.
    #[must_use]
    pub fn new_message(event: &FeedEvent) -> Self {
        Self {
            kind: NotificationKind::NewMessage,
            title: "New Message".into(),
            body: format!("New message from {}", event.author),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;
    use chrono::{TimeZone, Utc};

    fn event(content: &str) -> FeedEvent {
        FeedEvent {
            id: 1,
            content: content.into(),
            created_at: Timestamp(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
            author: "bo@example.edu".into(),
            author_id: 2,
            parent_id: Some(9),
            parent_author_id: Some(1),
        }
    }

    #[test]
    fn reply_body_is_excerpted() {
        let long = "x".repeat(80);
        let intent = NotificationIntent::new_reply(&event(&long));
        assert_eq!(intent.kind, NotificationKind::NewReply);
        assert!(intent.body.ends_with("..."));
        assert!(intent.body.contains("bo@example.edu"));
    }

    #[test]
    fn short_reply_body_is_not_truncated() {
        let intent = NotificationIntent::new_reply(&event("short"));
        assert!(intent.body.ends_with("short"));
    }

    #[test]
    fn new_message_body_names_author() {
        let intent = NotificationIntent::new_message(&event("hi"));
        assert_eq!(intent.kind, NotificationKind::NewMessage);
        assert_eq!(intent.body, "New message from bo@example.edu");
    }
}
