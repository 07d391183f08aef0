//! Narrow contract to the system of record.
//!
//! The relational store owns users, messages, and stars; this core only
//! consumes it through the operations below. All cache state is derived from
//! `list_all_messages` on startup.

mod postgres;

pub use postgres::PgMessageRepository;

use std::collections::HashSet;

use async_trait::async_trait;
use futures::stream::BoxStream;
use plaza_shared::{FeedFilter, Identity, Message};
use thiserror::Error;

/// Failure at the storage boundary.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The underlying database call failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read/write contract against the message store.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a new message and return it as stored.
    async fn create_message(
        &self,
        author: &Identity,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<Message, RepositoryError>;

    /// Fetch one message by id.
    async fn get_message(&self, id: i64) -> Result<Option<Message>, RepositoryError>;

    /// List messages matching `filter`, newest first, restricted to
    /// `id < cursor` when a cursor is given, capped at `limit`.
    async fn list_messages(
        &self,
        filter: &FeedFilter,
        cursor: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// Direct replies to any of `parent_ids`, oldest first.
    async fn list_replies(&self, parent_ids: &[i64]) -> Result<Vec<Message>, RepositoryError>;

    /// Stream the entire message history, used by the cache rebuild.
    fn list_all_messages(&self) -> BoxStream<'_, Result<Message, RepositoryError>>;

    /// Ids of the messages `viewer_id` has starred.
    async fn get_starred_ids(&self, viewer_id: i64) -> Result<HashSet<i64>, RepositoryError>;
}
