//! Activity store adapter.
//!
//! Thin interface over a shared key-value/pub-sub service: time-scored sorted
//! collections, sets, counter maps, and broadcast channels. No business logic
//! lives here; the cache and hub compose these primitives. Every operation is
//! atomic on the backing service, so callers never need read-modify-write
//! locking.

mod memory;
mod redis;

pub use memory::MemoryActivityStore;
pub use redis::RedisActivityStore;

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// I/O-shaped failure talking to the activity store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(String),
    /// A pub/sub subscription could not be established.
    #[error("pub/sub channel unavailable: {0}")]
    Subscribe(String),
}

/// Handle to the shared activity store.
///
/// Sorted-collection scores are epoch seconds; members are opaque strings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Liveness probe against the backend.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Add `member` to the sorted collection `key` with the given score.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError>;

    /// Remove every member of `key` whose score is strictly below `cutoff`,
    /// returning how many were removed.
    async fn zremrangebyscore_below(&self, key: &str, cutoff: f64) -> Result<u64, StoreError>;

    /// All members of the sorted collection `key`, lowest score first.
    async fn zrange_all(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Add `member` to the set `key`.
    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// All members of the set `key`.
    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Increment the counter `field` in map `key` by `delta`, returning the
    /// new value.
    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError>;

    /// Bulk-set counter fields in map `key`.
    async fn hset_all(&self, key: &str, entries: &[(String, i64)]) -> Result<(), StoreError>;

    /// Every counter in map `key`.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, i64>, StoreError>;

    /// Delete the collection stored at `key`.
    async fn del(&self, key: &str) -> Result<(), StoreError>;

    /// Publish `payload` on `channel`. Fire-and-forget: delivery to zero
    /// subscribers is success.
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError>;

    /// Subscribe to `channel`, yielding every payload published after the
    /// subscription is established.
    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>, StoreError>;
}
