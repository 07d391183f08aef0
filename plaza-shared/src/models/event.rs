use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Message, Timestamp};

/// The canonical "a message now exists" payload broadcast to live sessions.
///
/// Ephemeral: serialized onto the feed channel at publish time and never
/// persisted. `parent_author_id` is resolved once by the publisher so that
/// every session can derive reply notifications without a storage read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FeedEvent {
    /// Id of the newly created message.
    pub id: i64,
    /// Raw message text.
    pub content: String,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Author email.
    pub author: String,
    /// Author user id.
    pub author_id: i64,
    /// Parent message id when the event is a reply.
    pub parent_id: Option<i64>,
    /// Author of the parent message, resolved at publish time.
    pub parent_author_id: Option<i64>,
}

impl FeedEvent {
    /// Build the broadcast payload for a freshly persisted message.
    #[must_use]
    pub fn from_message(message: &Message, parent_author_id: Option<i64>) -> Self {
        Self {
            id: message.id,
            content: message.content.clone(),
            created_at: message.created_at.clone(),
            author: message.author.clone(),
            author_id: message.author_id,
            parent_id: message.parent_id,
            parent_author_id,
        }
    }

    /// Whether the event announces a reply rather than a top-level post.
    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn from_message_carries_parent_author() {
        let message = Message {
            id: 5,
            author_id: 2,
            author: "bo@example.edu".into(),
            content: "replying".into(),
            created_at: Timestamp(Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()),
            parent_id: Some(4),
        };

        let event = FeedEvent::from_message(&message, Some(1));
        assert!(event.is_reply());
        assert_eq!(event.parent_author_id, Some(1));
        assert_eq!(event.id, 5);
    }
}
