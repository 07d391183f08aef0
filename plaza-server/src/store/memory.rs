//! In-process activity store.
//!
//! Backs the test suites and single-process deployments that do not want a
//! Redis dependency. Data commands run under one mutex; pub/sub uses one
//! broadcast channel per logical channel, so slow receivers that fall behind
//! skip messages instead of blocking publishers.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::{ActivityStore, StoreError};

/// Capacity of each in-process broadcast channel.
const CHANNEL_CAPACITY: usize = 4096;

#[derive(Default)]
struct Collections {
    // member -> score per sorted collection
    zsets: HashMap<String, HashMap<String, f64>>,
    sets: HashMap<String, BTreeSet<String>>,
    hashes: HashMap<String, HashMap<String, i64>>,
}

/// Mutex-guarded maps plus broadcast channels.
#[derive(Default)]
pub struct MemoryActivityStore {
    collections: Mutex<Collections>,
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl std::fmt::Debug for MemoryActivityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryActivityStore").finish()
    }
}

impl MemoryActivityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        let mut channels = self.channels.lock().expect("channel registry poisoned");
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut guard = self.collections.lock().expect("collections poisoned");
        guard
            .zsets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zremrangebyscore_below(&self, key: &str, cutoff: f64) -> Result<u64, StoreError> {
        let mut guard = self.collections.lock().expect("collections poisoned");
        let Some(zset) = guard.zsets.get_mut(key) else {
            return Ok(0);
        };
        let before = zset.len();
        zset.retain(|_, score| *score >= cutoff);
        Ok((before - zset.len()) as u64)
    }

    async fn zrange_all(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let guard = self.collections.lock().expect("collections poisoned");
        let Some(zset) = guard.zsets.get(key) else {
            return Ok(Vec::new());
        };
        let mut entries: Vec<(&String, &f64)> = zset.iter().collect();
        entries.sort_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(b.0)));
        Ok(entries.into_iter().map(|(member, _)| member.clone()).collect())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut guard = self.collections.lock().expect("collections poisoned");
        guard
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let guard = self.collections.lock().expect("collections poisoned");
        Ok(guard
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        let mut guard = self.collections.lock().expect("collections poisoned");
        let counter = guard
            .hashes
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert(0);
        *counter += delta;
        Ok(*counter)
    }

    async fn hset_all(&self, key: &str, entries: &[(String, i64)]) -> Result<(), StoreError> {
        let mut guard = self.collections.lock().expect("collections poisoned");
        let hash = guard.hashes.entry(key.to_string()).or_default();
        for (field, value) in entries {
            hash.insert(field.clone(), *value);
        }
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, i64>, StoreError> {
        let guard = self.collections.lock().expect("collections poisoned");
        Ok(guard.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.collections.lock().expect("collections poisoned");
        guard.zsets.remove(key);
        guard.sets.remove(key);
        guard.hashes.remove(key);
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        // send() errors when no subscriber exists; live-only semantics make
        // that a silent drop.
        let _ = self.sender(channel).send(payload.to_string());
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>, StoreError> {
        let receiver = self.sender(channel).subscribe();
        let stream = BroadcastStream::new(receiver).filter_map(|item| async move { item.ok() });
        Ok(Box::pin(stream))
    }
}
