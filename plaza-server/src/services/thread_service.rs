//! Thread assembly and feed listing.
//!
//! Conversations live flat in storage, keyed by id with a self-referential
//! parent id. Trees are materialized by explicit bounded-depth traversal: one
//! `list_replies` round-trip per level, never unbounded recursion over an
//! object graph. Replies deeper than the configured depth are omitted by
//! design; callers wanting more issue the assembler again at a deeper node.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use plaza_shared::config::FeedConfig;
use plaza_shared::{FeedFilter, FeedItem, FeedPage, Identity, Message};
use thiserror::Error;
use tracing::instrument;

use crate::repository::{MessageRepository, RepositoryError};
use crate::text;

/// Failure assembling a thread or listing the feed.
#[derive(Debug, Error)]
pub enum ThreadError {
    /// The requested message does not exist.
    #[error("message {0} not found")]
    NotFound(i64),
    /// The parent chain is cyclic or references a missing message. A storage
    /// defect: surfaced, never silently repaired.
    #[error("thread ancestry is inconsistent")]
    Integrity,
    /// The storage read failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Assembles reply trees and paginated feed listings.
pub struct ThreadService {
    repo: Arc<dyn MessageRepository>,
    depth: usize,
    page_size: i64,
}

impl std::fmt::Debug for ThreadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadService")
            .field("depth", &self.depth)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl ThreadService {
    /// Build the service with depth and page size from `config`.
    #[must_use]
    pub fn new(repo: Arc<dyn MessageRepository>, config: &FeedConfig) -> Self {
        Self {
            repo,
            depth: config.thread_depth,
            page_size: config.page_size,
        }
    }

    /// Assemble the conversation containing `message_id`: resolve the thread
    /// root by walking parent references, then eagerly load replies to the
    /// fixed depth. The node matching `message_id` carries `is_focused`.
    ///
    /// # Errors
    /// [`ThreadError::NotFound`] for an unknown id,
    /// [`ThreadError::Integrity`] for a cyclic or dangling parent chain.
    #[instrument(name = "thread.get", skip(self, viewer), err)]
    pub async fn get_thread(
        &self,
        message_id: i64,
        viewer: Option<&Identity>,
    ) -> Result<FeedItem, ThreadError> {
        let starred = self.starred_for(viewer).await?;
        let root = self.resolve_root(message_id).await?;
        let children = self.load_descendants(&[root.id]).await?;
        Ok(build_item(
            &root,
            &children,
            starred.as_ref(),
            Some(message_id),
        ))
    }

    /// One page of the feed, newest first, with each item's reply tree
    /// eagerly loaded to the fixed depth. The next cursor is the id of the
    /// last item, absent when the page came up short of the limit.
    ///
    /// # Errors
    /// Storage failures surface as [`ThreadError::Repository`].
    #[instrument(name = "thread.list_feed", skip(self, filter, viewer), err)]
    pub async fn list_feed(
        &self,
        filter: &FeedFilter,
        cursor: Option<i64>,
        viewer: Option<&Identity>,
    ) -> Result<FeedPage, ThreadError> {
        let starred = self.starred_for(viewer).await?;
        let messages = self
            .repo
            .list_messages(filter, cursor, self.page_size)
            .await?;

        let next_cursor = if messages.len() as i64 == self.page_size {
            messages.last().map(|message| message.id)
        } else {
            None
        };

        let roots: Vec<i64> = messages.iter().map(|message| message.id).collect();
        let children = self.load_descendants(&roots).await?;

        let items = messages
            .iter()
            .map(|message| build_item(message, &children, starred.as_ref(), None))
            .collect();

        Ok(FeedPage { items, next_cursor })
    }

    async fn starred_for(
        &self,
        viewer: Option<&Identity>,
    ) -> Result<Option<HashSet<i64>>, ThreadError> {
        match viewer {
            Some(viewer) => Ok(Some(self.repo.get_starred_ids(viewer.id).await?)),
            None => Ok(None),
        }
    }

    /// Walk `parent_id` references up to the thread root. Iterative with a
    /// visited set: a revisited id or a dangling parent reference terminates
    /// with an integrity error instead of looping.
    async fn resolve_root(&self, message_id: i64) -> Result<Message, ThreadError> {
        let mut current = self
            .repo
            .get_message(message_id)
            .await?
            .ok_or(ThreadError::NotFound(message_id))?;

        let mut visited: HashSet<i64> = HashSet::new();
        while let Some(parent_id) = current.parent_id {
            if !visited.insert(current.id) {
                return Err(ThreadError::Integrity);
            }
            current = self
                .repo
                .get_message(parent_id)
                .await?
                .ok_or(ThreadError::Integrity)?;
        }
        Ok(current)
    }

    /// Load descendants of `roots` level by level, to the fixed depth.
    async fn load_descendants(
        &self,
        roots: &[i64],
    ) -> Result<HashMap<i64, Vec<Message>>, ThreadError> {
        let mut children: HashMap<i64, Vec<Message>> = HashMap::new();
        let mut frontier: Vec<i64> = roots.to_vec();

        for _ in 0..self.depth {
            if frontier.is_empty() {
                break;
            }
            let replies = self.repo.list_replies(&frontier).await?;
            frontier = replies.iter().map(|reply| reply.id).collect();
            for reply in replies {
                if let Some(parent_id) = reply.parent_id {
                    children.entry(parent_id).or_default().push(reply);
                }
            }
        }

        Ok(children)
    }
}

/// Render one message and its loaded descendants into a [`FeedItem`] tree.
/// Recursion is bounded by the assembler's fixed depth.
fn build_item(
    message: &Message,
    children: &HashMap<i64, Vec<Message>>,
    starred: Option<&HashSet<i64>>,
    focus: Option<i64>,
) -> FeedItem {
    let replies = children
        .get(&message.id)
        .map(|kids| {
            kids.iter()
                .map(|kid| build_item(kid, children, starred, focus))
                .collect()
        })
        .unwrap_or_default();

    FeedItem {
        id: message.id,
        content: text::linkify(&message.content),
        created_at: text::format_clock(&message.created_at.0),
        created_at_iso: text::format_iso(&message.created_at.0),
        author: message.author.clone(),
        author_id: message.author_id,
        is_starred: starred.map(|set| set.contains(&message.id)),
        is_focused: focus == Some(message.id),
        replies,
    }
}
