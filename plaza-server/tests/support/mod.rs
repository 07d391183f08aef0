//! In-memory message repository backing the integration suite.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use futures::stream::BoxStream;
use plaza_server::repository::{MessageRepository, RepositoryError};
use plaza_shared::{FeedFilter, Identity, Message, Timestamp};

/// Message store over a mutex-guarded vector, mirroring the SQL adapter's
/// filter and ordering semantics.
#[derive(Default)]
pub struct MemoryMessageRepository {
    messages: Mutex<Vec<Message>>,
    stars: Mutex<HashSet<(i64, i64)>>,
    next_id: AtomicI64,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    #[allow(dead_code)]
    pub fn star(&self, viewer_id: i64, message_id: i64) {
        self.stars.lock().unwrap().insert((viewer_id, message_id));
    }

    fn matches(filter: &FeedFilter, message: &Message) -> bool {
        if filter.top_level_only && message.parent_id.is_some() {
            return false;
        }
        if !filter.tags.is_empty() {
            let tagged = filter
                .tags
                .iter()
                .any(|tag| message.content.contains(&format!("#{tag}")));
            if !tagged {
                return false;
            }
        }
        if let Some(search) = &filter.search {
            if !message
                .content
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn create_message(
        &self,
        author: &Identity,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<Message, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let message = Message {
            id,
            author_id: author.id,
            author: author.email.clone(),
            content: content.to_string(),
            created_at: Timestamp(Utc::now()),
            parent_id,
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn get_message(&self, id: i64) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .find(|message| message.id == id)
            .cloned())
    }

    async fn list_messages(
        &self,
        filter: &FeedFilter,
        cursor: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut matched: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|message| cursor.is_none_or(|cursor| message.id < cursor))
            .filter(|message| Self::matches(filter, message))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matched.truncate(limit.max(0) as usize);
        Ok(matched)
    }

    async fn list_replies(&self, parent_ids: &[i64]) -> Result<Vec<Message>, RepositoryError> {
        let mut replies: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|message| {
                message
                    .parent_id
                    .is_some_and(|parent| parent_ids.contains(&parent))
            })
            .cloned()
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(replies)
    }

    fn list_all_messages(&self) -> BoxStream<'_, Result<Message, RepositoryError>> {
        let snapshot: Vec<Message> = self.messages.lock().unwrap().clone();
        futures::stream::iter(snapshot.into_iter().map(Ok)).boxed()
    }

    async fn get_starred_ids(&self, viewer_id: i64) -> Result<HashSet<i64>, RepositoryError> {
        Ok(self
            .stars
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _)| *user == viewer_id)
            .map(|(_, message)| *message)
            .collect())
    }
}
