//! PostgreSQL implementation of the message repository.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use plaza_shared::{FeedFilter, Identity, Message, Timestamp};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{MessageRepository, RepositoryError};

// Shared select head; a macro so `concat!` can splice it into literals.
macro_rules! select_message {
    () => {
        "SELECT m.id, m.user_id AS author_id, u.email AS author, \
         m.content, m.created_at, m.parent_id \
         FROM messages m JOIN users u ON u.id = m.user_id"
    };
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    author_id: i64,
    author: String,
    content: String,
    created_at: DateTime<Utc>,
    parent_id: Option<i64>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            author_id: row.author_id,
            author: row.author,
            content: row.content,
            created_at: Timestamp(row.created_at),
            parent_id: row.parent_id,
        }
    }
}

/// Message repository over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Creates a repository with the given database pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &FeedFilter) {
        if filter.top_level_only {
            builder.push(" AND m.parent_id IS NULL");
        }
        if !filter.tags.is_empty() {
            builder.push(" AND (");
            for (index, tag) in filter.tags.iter().enumerate() {
                if index > 0 {
                    builder.push(" OR ");
                }
                builder
                    .push("m.content LIKE ")
                    .push_bind(format!("%#{tag}%"));
            }
            builder.push(")");
        }
        if let Some(search) = &filter.search {
            builder
                .push(" AND m.content ILIKE ")
                .push_bind(format!("%{search}%"));
        }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create_message(
        &self,
        author: &Identity,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<Message, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct InsertRow {
            id: i64,
            created_at: DateTime<Utc>,
        }

        let row = sqlx::query_as::<_, InsertRow>(
            "INSERT INTO messages (user_id, content, parent_id) \
             VALUES ($1, $2, $3) RETURNING id, created_at",
        )
        .bind(author.id)
        .bind(content)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Message {
            id: row.id,
            author_id: author.id,
            author: author.email.clone(),
            content: content.to_string(),
            created_at: Timestamp(row.created_at),
            parent_id,
        })
    }

    async fn get_message(&self, id: i64) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query_as::<_, MessageRow>(concat!(select_message!(), " WHERE m.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Message::from))
    }

    async fn list_messages(
        &self,
        filter: &FeedFilter,
        cursor: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(concat!(select_message!(), " WHERE TRUE"));
        if let Some(cursor) = cursor {
            builder.push(" AND m.id < ").push_bind(cursor);
        }
        Self::push_filters(&mut builder, filter);
        builder
            .push(" ORDER BY m.created_at DESC, m.id DESC LIMIT ")
            .push_bind(limit);

        let rows = builder
            .build_query_as::<MessageRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn list_replies(&self, parent_ids: &[i64]) -> Result<Vec<Message>, RepositoryError> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, MessageRow>(concat!(
            select_message!(),
            " WHERE m.parent_id = ANY($1) ORDER BY m.created_at ASC, m.id ASC"
        ))
        .bind(parent_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    fn list_all_messages(&self) -> BoxStream<'_, Result<Message, RepositoryError>> {
        sqlx::query_as::<_, MessageRow>(concat!(select_message!(), " ORDER BY m.id ASC"))
            .fetch(&self.pool)
            .map(|row| row.map(Message::from).map_err(RepositoryError::from))
            .boxed()
    }

    async fn get_starred_ids(&self, viewer_id: i64) -> Result<HashSet<i64>, RepositoryError> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT message_id FROM stars WHERE user_id = $1")
                .bind(viewer_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().collect())
    }
}
