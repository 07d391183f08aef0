//! Per-connection live update session.
//!
//! One session per connected viewer: it owns its subscription to the feed
//! channel, applies the viewer's filters, derives notification intents, and
//! renders fragments for the client. Sessions share no mutable state with
//! each other; each is a single task processing its events sequentially. A
//! session ends when the client disconnects (its outbound channel closes) or
//! the process shuts down.

use metrics::counter;
use plaza_shared::{FeedEvent, FeedFragment, Identity, NotificationIntent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::services::broadcast::FeedBroadcast;
use crate::store::StoreError;
use crate::text;

/// Outbound payload produced by a session for its client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A rendered message fragment that passed the session's filters.
    Fragment(FeedFragment),
    /// A notification derived for this viewer.
    Notification(NotificationIntent),
}

/// What one feed event produced for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutput {
    /// At most one notification intent per event.
    pub notification: Option<NotificationIntent>,
    /// The fragment to push, absent when a filter suppressed the event.
    pub fragment: Option<FeedFragment>,
}

/// Filter and identity state for one live connection, fixed at subscribe
/// time.
#[derive(Debug, Clone)]
pub struct LiveSession {
    viewer: Option<Identity>,
    tags: Vec<String>,
    search: Option<String>,
}

impl LiveSession {
    /// Create session state for a connection.
    #[must_use]
    pub fn new(viewer: Option<Identity>, tags: Vec<String>, search: Option<String>) -> Self {
        Self {
            viewer,
            tags,
            search: search.filter(|s| !s.is_empty()),
        }
    }

    /// Evaluate one feed event for this session. Notification intent is
    /// derived before filtering: a suppressed fragment can still notify.
    #[must_use]
    pub fn evaluate(&self, event: &FeedEvent) -> SessionOutput {
        let notification = self.notification_for(event);
        let fragment = self.passes_filters(event).then(|| render_fragment(event));
        SessionOutput {
            notification,
            fragment,
        }
    }

    fn notification_for(&self, event: &FeedEvent) -> Option<NotificationIntent> {
        // Authors are never notified about their own posts.
        if self
            .viewer
            .as_ref()
            .is_some_and(|viewer| viewer.id == event.author_id)
        {
            return None;
        }

        let reply_to_viewer = match (&self.viewer, event.parent_author_id) {
            (Some(viewer), Some(parent_author)) => viewer.id == parent_author,
            _ => false,
        };

        if reply_to_viewer {
            Some(NotificationIntent::new_reply(event))
        } else if event.parent_id.is_none() {
            Some(NotificationIntent::new_message(event))
        } else {
            None
        }
    }

    fn passes_filters(&self, event: &FeedEvent) -> bool {
        if !self.tags.is_empty() {
            let tagged = self
                .tags
                .iter()
                .any(|tag| event.content.contains(&format!("#{tag}")));
            if !tagged {
                return false;
            }
        }

        if let Some(search) = &self.search {
            if !event
                .content
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }

        true
    }

    /// Subscribe to the hub and run the session loop on its own task.
    ///
    /// The returned receiver backs the client connection; dropping it (the
    /// client went away) or cancelling the hub's shutdown token ends the
    /// task and tears the subscription down with it.
    ///
    /// # Errors
    /// Returns an error when the hub subscription cannot be established.
    pub async fn spawn(
        self,
        hub: &FeedBroadcast,
        capacity: usize,
    ) -> Result<mpsc::Receiver<SessionEvent>, StoreError> {
        use futures::StreamExt;

        let mut events = hub.subscribe().await?;
        let shutdown: CancellationToken = hub.shutdown_token();
        let (tx, rx) = mpsc::channel(capacity.max(1));

        tokio::spawn(async move {
            counter!("plaza_live_sessions_opened_total").increment(1);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    maybe_event = events.next() => {
                        let Some(event) = maybe_event else { break };
                        let output = self.evaluate(&event);
                        if let Some(notification) = output.notification {
                            if tx.send(SessionEvent::Notification(notification)).await.is_err() {
                                break;
                            }
                        }
                        if let Some(fragment) = output.fragment {
                            if tx.send(SessionEvent::Fragment(fragment)).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
            debug!("live session closed");
            counter!("plaza_live_sessions_closed_total").increment(1);
        });

        Ok(rx)
    }
}

/// Render the client-ready fragment for an event.
fn render_fragment(event: &FeedEvent) -> FeedFragment {
    FeedFragment {
        message_id: event.id,
        content: text::linkify(&event.content),
        created_at: text::format_clock(&event.created_at.0),
        created_at_iso: text::format_iso(&event.created_at.0),
        author: event.author.clone(),
        author_id: event.author_id,
        parent_id: event.parent_id,
    }
}
