//! Post path: validate, persist, cache, broadcast.
//!
//! Persistence is the only fatal step. Cache updates and the broadcast are
//! best-effort: once the write commits, a sick activity store degrades the
//! trending sidebar or live delivery, never the post itself.

use std::sync::Arc;

use metrics::counter;
use plaza_shared::{FeedEvent, Identity, Message};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::repository::{MessageRepository, RepositoryError};
use crate::services::activity_cache::ActivityCache;
use crate::services::broadcast::FeedBroadcast;
use crate::text;

/// Weighted character budget per message; URLs weigh one character.
pub const MAX_WEIGHTED_CHARS: usize = 140;

/// Failure creating a message.
#[derive(Debug, Error)]
pub enum FeedServiceError {
    /// The request was rejected before any side effect.
    #[error("validation error: {0}")]
    Validation(String),
    /// Persisting the message failed; nothing was cached or broadcast.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Coordinates the write path of the feed.
pub struct FeedService {
    repo: Arc<dyn MessageRepository>,
    cache: Arc<ActivityCache>,
    hub: FeedBroadcast,
}

impl std::fmt::Debug for FeedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedService").finish()
    }
}

impl FeedService {
    /// Wire the post path against its collaborators.
    #[must_use]
    pub fn new(
        repo: Arc<dyn MessageRepository>,
        cache: Arc<ActivityCache>,
        hub: FeedBroadcast,
    ) -> Self {
        Self { repo, cache, hub }
    }

    /// Create a top-level post or reply on behalf of `viewer`.
    ///
    /// # Errors
    /// [`FeedServiceError::Validation`] when the content exceeds the weighted
    /// budget; [`FeedServiceError::Repository`] when persistence fails.
    #[instrument(name = "feed.post_message", skip(self, viewer, content), err)]
    pub async fn post_message(
        &self,
        viewer: &Identity,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<Message, FeedServiceError> {
        if text::weighted_length(content) > MAX_WEIGHTED_CHARS {
            return Err(FeedServiceError::Validation("Message too long".into()));
        }

        let message = self.repo.create_message(viewer, content, parent_id).await?;

        let tags = text::extract_hashtags(content);
        let terms = text::extract_terms(content);
        if !tags.is_empty() || !terms.is_empty() {
            if let Err(err) = self
                .cache
                .record_activity(&tags, &terms, message.id, &message.created_at.0)
                .await
            {
                counter!("plaza_cache_degraded_total").increment(1);
                warn!(error = %err, message_id = message.id, "activity cache update skipped");
            }
        }

        let parent_author_id = self.resolve_parent_author(&message).await;

        let event = FeedEvent::from_message(&message, parent_author_id);
        if let Err(err) = self.hub.publish(&event).await {
            counter!("plaza_broadcast_failed_total").increment(1);
            warn!(error = %err, message_id = message.id, "feed broadcast skipped");
        }

        counter!("plaza_messages_posted_total").increment(1);
        Ok(message)
    }

    /// Resolve the parent's author for reply notifications. The message is
    /// already committed, so a failed lookup degrades the event instead of
    /// failing the post.
    async fn resolve_parent_author(&self, message: &Message) -> Option<i64> {
        let parent_id = message.parent_id?;
        match self.repo.get_message(parent_id).await {
            Ok(parent) => parent.map(|parent| parent.author_id),
            Err(err) => {
                warn!(error = %err, parent_id, "parent author lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::MemoryMessageRepository;
    use crate::store::{ActivityStore, MemoryActivityStore};
    use chrono::{TimeZone, Utc};
    use futures::StreamExt;
    use plaza_shared::config::FeedConfig;
    use tokio::time::{Duration, timeout};

    struct Fixture {
        repo: Arc<MemoryMessageRepository>,
        store: Arc<MemoryActivityStore>,
        hub: FeedBroadcast,
        service: FeedService,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(MemoryMessageRepository::new());
        repo.set_clock(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
        let store = Arc::new(MemoryActivityStore::new());
        let cache = Arc::new(ActivityCache::new(store.clone(), &FeedConfig::default()));
        let hub = FeedBroadcast::new(store.clone(), "plaza_feed");
        let service = FeedService::new(repo.clone(), cache, hub.clone());
        Fixture {
            repo,
            store,
            hub,
            service,
        }
    }

    fn viewer(id: i64) -> Identity {
        Identity {
            id,
            email: format!("user{id}@example.edu"),
        }
    }

    #[tokio::test]
    async fn over_budget_content_is_rejected_before_side_effects() {
        let fx = fixture();
        let long = "x".repeat(141);
        let result = fx.service.post_message(&viewer(1), &long, None).await;
        assert!(matches!(result, Err(FeedServiceError::Validation(_))));
        assert!(fx.repo.get_message(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn urls_weigh_one_character() {
        let fx = fixture();
        let content = format!(
            "{} https://arxiv.org/abs/some/extremely/long/paper/path/goes/here",
            "y".repeat(135)
        );
        let result = fx.service.post_message(&viewer(1), &content, None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn posting_updates_cache_and_broadcasts() {
        let fx = fixture();
        let mut events = fx.hub.subscribe().await.unwrap();

        let message = fx
            .service
            .post_message(&viewer(1), "Hello #ai see https://arxiv.org/abs/1", None)
            .await
            .unwrap();

        let counts = fx.store.hgetall("hashtag_counts").await.unwrap();
        assert_eq!(counts.get("ai"), Some(&1));

        let event = timeout(Duration::from_secs(1), events.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.id, message.id);
        assert!(event.parent_author_id.is_none());
    }

    #[tokio::test]
    async fn replies_carry_the_parent_author() {
        let fx = fixture();
        let root = fx
            .service
            .post_message(&viewer(1), "root post", None)
            .await
            .unwrap();

        let mut events = fx.hub.subscribe().await.unwrap();
        fx.service
            .post_message(&viewer(2), "a reply", Some(root.id))
            .await
            .unwrap();

        let event = timeout(Duration::from_secs(1), events.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.parent_id, Some(root.id));
        assert_eq!(event.parent_author_id, Some(1));
    }

    #[tokio::test]
    async fn reply_to_missing_parent_degrades_to_no_parent_author() {
        let fx = fixture();
        let mut events = fx.hub.subscribe().await.unwrap();

        fx.service
            .post_message(&viewer(2), "orphan reply", Some(404))
            .await
            .unwrap();

        let event = timeout(Duration::from_secs(1), events.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.parent_id, Some(404));
        assert!(event.parent_author_id.is_none());
    }
}
