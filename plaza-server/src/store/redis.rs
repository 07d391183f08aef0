//! Redis-backed activity store.
//!
//! Data commands go through a shared [`ConnectionManager`]; each pub/sub
//! subscription gets its own dedicated connection, as Redis requires.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::{ActivityStore, StoreError};

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Activity store over a Redis deployment.
pub struct RedisActivityStore {
    client: Client,
    manager: ConnectionManager,
}

impl std::fmt::Debug for RedisActivityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisActivityStore").finish()
    }
}

impl RedisActivityStore {
    /// Connect to the Redis instance at `url`.
    ///
    /// # Errors
    /// Returns an error if the URL is malformed or the initial connection
    /// cannot be established.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { client, manager })
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[async_trait]
impl ActivityStore for RedisActivityStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn();
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut conn = self.conn();
        conn.zadd::<_, _, _, ()>(key, member, score).await?;
        Ok(())
    }

    async fn zremrangebyscore_below(&self, key: &str, cutoff: f64) -> Result<u64, StoreError> {
        let mut conn = self.conn();
        // Exclusive upper bound: only scores strictly below the cutoff go.
        let removed: u64 = conn
            .zrembyscore(key, "-inf", format!("({cutoff}"))
            .await?;
        Ok(removed)
    }

    async fn zrange_all(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn();
        let members: Vec<String> = conn.zrange(key, 0, -1).await?;
        Ok(members)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        conn.sadd::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn();
        let members: Vec<String> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        let mut conn = self.conn();
        let value: i64 = conn.hincr(key, field, delta).await?;
        Ok(value)
    }

    async fn hset_all(&self, key: &str, entries: &[(String, i64)]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        conn.hset_multiple::<_, _, _, ()>(key, entries).await?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, i64>, StoreError> {
        let mut conn = self.conn();
        let counters: HashMap<String, i64> = conn.hgetall(key).await?;
        Ok(counters)
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        // The receiver count is irrelevant: zero subscribers is a silent drop.
        conn.publish::<_, _, ()>(channel, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>, StoreError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|err| StoreError::Subscribe(err.to_string()))?;
        pubsub
            .subscribe(channel)
            .await
            .map_err(|err| StoreError::Subscribe(err.to_string()))?;

        let stream = pubsub
            .into_on_message()
            .filter_map(|msg| async move { msg.get_payload::<String>().ok() });
        Ok(Box::pin(stream))
    }
}
