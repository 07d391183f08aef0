use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Timestamp;

/// A message in the town square, as read back from the system of record.
///
/// Threading is expressed through `parent_id`: `None` marks a top-level post,
/// otherwise the id of an already-persisted parent. Because a message can only
/// reference a parent that existed at creation time, the ancestor chain is
/// finite and acyclic by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    /// Opaque increasing identifier assigned by storage.
    pub id: i64,

    /// Id of the author in the user table.
    pub author_id: i64,

    /// Author email, used as the display handle.
    pub author: String,

    /// Raw message text (may contain hashtags and URLs).
    pub content: String,

    /// When the message was posted.
    pub created_at: Timestamp,

    /// Parent message id for replies; `None` for top-level posts.
    pub parent_id: Option<i64>,
}

impl Message {
    /// Whether this message starts a thread.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample(parent_id: Option<i64>) -> Message {
        Message {
            id: 42,
            author_id: 7,
            author: "ada@example.edu".into(),
            content: "hello #plaza".into(),
            created_at: Timestamp(Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()),
            parent_id,
        }
    }

    #[test]
    fn top_level_detection() {
        assert!(sample(None).is_top_level());
        assert!(!sample(Some(1)).is_top_level());
    }

    #[test]
    fn serialization_round_trip() {
        let message = sample(Some(9));
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
    }
}
