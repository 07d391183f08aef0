//! Broadcast hub: the single point of publication for "a message now exists".
//!
//! Events go out on one logical channel of the activity store. Delivery is
//! fire-and-forget: no acknowledgment, no persistence, no retry, and an event
//! published with nobody subscribed simply vanishes. Every subscriber gets
//! every event independently; competing consumption is not supported.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use metrics::counter;
use plaza_shared::FeedEvent;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::store::{ActivityStore, StoreError};

/// Handle to the feed broadcast channel. Cloneable; store one in app state.
#[derive(Clone)]
pub struct FeedBroadcast {
    store: Arc<dyn ActivityStore>,
    channel: String,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for FeedBroadcast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedBroadcast")
            .field("channel", &self.channel)
            .finish()
    }
}

impl FeedBroadcast {
    /// Create a hub publishing on `channel`.
    #[must_use]
    pub fn new(store: Arc<dyn ActivityStore>, channel: impl Into<String>) -> Self {
        Self {
            store,
            channel: channel.into(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Serialize `event` and send it on the feed channel.
    ///
    /// # Errors
    /// Store I/O failure. The caller decides whether that matters; the post
    /// path logs and moves on because the write already committed.
    pub async fn publish(&self, event: &FeedEvent) -> Result<(), StoreError> {
        let payload = serde_json::to_string(event)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        self.store.publish(&self.channel, &payload).await?;
        counter!("plaza_events_published_total").increment(1);
        Ok(())
    }

    /// Continuous, unbounded-lifetime sequence of feed events for one
    /// session. Payloads that fail to decode are skipped with a warning.
    ///
    /// # Errors
    /// Returns an error when the subscription cannot be established.
    pub async fn subscribe(&self) -> Result<BoxStream<'static, FeedEvent>, StoreError> {
        let raw = self.store.subscribe(&self.channel).await?;
        let events = raw.filter_map(|payload| async move {
            match serde_json::from_str::<FeedEvent>(&payload) {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(error = %err, "dropping undecodable feed payload");
                    None
                }
            }
        });
        Ok(Box::pin(events))
    }

    /// Token cancelled when the process shuts down; live sessions watch it to
    /// tear down their subscriptions promptly.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Signal every live session to terminate.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryActivityStore;
    use chrono::{TimeZone, Utc};
    use plaza_shared::Timestamp;
    use tokio::time::{Duration, timeout};

    fn hub() -> FeedBroadcast {
        FeedBroadcast::new(Arc::new(MemoryActivityStore::new()), "plaza_feed")
    }

    fn event(id: i64) -> FeedEvent {
        FeedEvent {
            id,
            content: "hello #ai".into(),
            created_at: Timestamp(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
            author: "ada@example.edu".into(),
            author_id: 1,
            parent_id: None,
            parent_author_id: None,
        }
    }

    #[tokio::test]
    async fn every_subscriber_receives_each_event() {
        let hub = hub();
        let mut first = hub.subscribe().await.unwrap();
        let mut second = hub.subscribe().await.unwrap();

        hub.publish(&event(1)).await.unwrap();

        let got_first = timeout(Duration::from_secs(1), first.next())
            .await
            .unwrap()
            .unwrap();
        let got_second = timeout(Duration::from_secs(1), second.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got_first.id, 1);
        assert_eq!(got_second.id, 1);
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let hub = hub();
        assert!(hub.publish(&event(1)).await.is_ok());
    }

    #[tokio::test]
    async fn undecodable_payloads_are_skipped() {
        let store = Arc::new(MemoryActivityStore::new());
        let hub = FeedBroadcast::new(store.clone(), "plaza_feed");
        let mut events = hub.subscribe().await.unwrap();

        store.publish("plaza_feed", "not json").await.unwrap();
        hub.publish(&event(2)).await.unwrap();

        let got = timeout(Duration::from_secs(1), events.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.id, 2);
    }

    #[tokio::test]
    async fn shutdown_cancels_the_shared_token() {
        let hub = hub();
        let token = hub.shutdown_token();
        assert!(!token.is_cancelled());
        hub.shutdown();
        assert!(token.is_cancelled());
    }
}
