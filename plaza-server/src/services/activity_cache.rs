//! Hashtag and term activity cache.
//!
//! Derived state only: the message table is the system of record and this
//! cache is a rebuildable projection of it. Trending data lives in
//! time-scored collections that are pruned lazily on read; lifetime counts
//! and the all-time tag/term sets survive restarts via [`ActivityCache::rebuild`],
//! which must complete before the process serves its first trending read.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::{Stream, StreamExt};
use plaza_shared::HashtagEntry;
use plaza_shared::config::FeedConfig;
use thiserror::Error;
use tracing::{info, instrument};

use crate::repository::RepositoryError;
use crate::store::{ActivityStore, StoreError};
use crate::text;

/// Time-scored hashtag usage, one entry per (tag, message).
const HASHTAG_ACTIVITY: &str = "hashtag_activity";
/// Every hashtag ever observed.
const ALL_HASHTAGS: &str = "all_hashtags";
/// Lifetime usage counter per hashtag.
const HASHTAG_COUNTS: &str = "hashtag_counts";
/// Time-scored search-term usage.
const TERM_ACTIVITY: &str = "term_activity";
/// Every term ever observed.
const ALL_TERMS: &str = "all_terms";

/// The cache could not reach its backing store. Callers degrade to "no
/// trending data" instead of failing the surrounding operation.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Store-adapter I/O failure.
    #[error("activity cache unavailable: {0}")]
    Unavailable(#[from] StoreError),
}

/// A startup rebuild failed; the process must not begin serving reads.
#[derive(Debug, Error)]
pub enum RebuildError {
    /// The cache store failed mid-rebuild.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The system of record could not be read.
    #[error("source read failed during rebuild: {0}")]
    Source(#[from] RepositoryError),
}

/// Fast approximate answers to "what is trending" and "how often has tag X
/// ever been used", maintained on the activity store.
pub struct ActivityCache {
    store: Arc<dyn ActivityStore>,
    trending_window: Duration,
    term_retention: Duration,
}

impl std::fmt::Debug for ActivityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityCache")
            .field("trending_window", &self.trending_window)
            .field("term_retention", &self.term_retention)
            .finish()
    }
}

impl ActivityCache {
    /// Build a cache over `store` with windows from `config`.
    #[must_use]
    pub fn new(store: Arc<dyn ActivityStore>, config: &FeedConfig) -> Self {
        Self {
            store,
            trending_window: Duration::seconds(config.trending_window_secs as i64),
            term_retention: Duration::seconds(config.term_retention_secs as i64),
        }
    }

    /// Record hashtag and term usage for a freshly persisted message.
    ///
    /// Duplicate tags or terms within one call collapse through set
    /// semantics. The term collection is trimmed to its retention horizon on
    /// the way out so write traffic keeps it bounded even without reads.
    ///
    /// # Errors
    /// [`CacheError::Unavailable`] on store I/O failure; the message write
    /// already committed, so callers log and continue.
    #[instrument(name = "cache.record_activity", skip(self, tags, terms), err)]
    pub async fn record_activity(
        &self,
        tags: &[String],
        terms: &[String],
        message_id: i64,
        timestamp: &DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let score = timestamp.timestamp() as f64;

        for tag in tags {
            let member = format!("{tag}:{message_id}");
            self.store.zadd(HASHTAG_ACTIVITY, &member, score).await?;
            self.store.sadd(ALL_HASHTAGS, tag).await?;
            self.store.hincrby(HASHTAG_COUNTS, tag, 1).await?;
        }

        for term in terms {
            let member = format!("{term}:{message_id}");
            self.store.zadd(TERM_ACTIVITY, &member, score).await?;
            self.store.sadd(ALL_TERMS, term).await?;
        }

        let term_cutoff = (*timestamp - self.term_retention).timestamp() as f64;
        self.store
            .zremrangebyscore_below(TERM_ACTIVITY, term_cutoff)
            .await?;

        Ok(())
    }

    /// Evict activity entries that fell out of their windows: the trending
    /// window for hashtags, the retention horizon for terms. Invoked before
    /// every trending read; there is no background sweep.
    ///
    /// # Errors
    /// [`CacheError::Unavailable`] on store I/O failure.
    pub async fn prune(&self, now: &DateTime<Utc>) -> Result<(), CacheError> {
        let hashtag_cutoff = (*now - self.trending_window).timestamp() as f64;
        self.store
            .zremrangebyscore_below(HASHTAG_ACTIVITY, hashtag_cutoff)
            .await?;

        let term_cutoff = (*now - self.term_retention).timestamp() as f64;
        self.store
            .zremrangebyscore_below(TERM_ACTIVITY, term_cutoff)
            .await?;

        Ok(())
    }

    /// Per-tag count of activity entries surviving inside the trending
    /// window. An O(window) scan; the window is time-bounded, not
    /// data-bounded.
    ///
    /// # Errors
    /// [`CacheError::Unavailable`] on store I/O failure.
    pub async fn trending_counts(
        &self,
        now: &DateTime<Utc>,
    ) -> Result<HashMap<String, i64>, CacheError> {
        self.prune(now).await?;

        let mut counts: HashMap<String, i64> = HashMap::new();
        for member in self.store.zrange_all(HASHTAG_ACTIVITY).await? {
            // Member format is "tag:message_id".
            if let Some((tag, _)) = member.split_once(':') {
                *counts.entry(tag.to_string()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    /// The sidebar projection: every known tag with its lifetime count,
    /// ordered by trending count, then lifetime count, then tag name for a
    /// deterministic tie-break. Tags in `selected` move to the front in the
    /// order supplied, appearing even when the cache has never seen them.
    ///
    /// # Errors
    /// [`CacheError::Unavailable`] on store I/O failure.
    #[instrument(name = "cache.list_hashtags", skip(self), err)]
    pub async fn list_hashtags(
        &self,
        selected: &[String],
        now: &DateTime<Utc>,
    ) -> Result<Vec<HashtagEntry>, CacheError> {
        let trending = self.trending_counts(now).await?;
        let all_tags = self.store.smembers(ALL_HASHTAGS).await?;
        let totals = self.store.hgetall(HASHTAG_COUNTS).await?;

        let mut ranked: Vec<(String, i64, i64)> = all_tags
            .into_iter()
            .map(|tag| {
                let total = totals.get(&tag).copied().unwrap_or(0);
                let recent = trending.get(&tag).copied().unwrap_or(0);
                (tag, total, recent)
            })
            .collect();
        ranked.sort_by(|a, b| b.2.cmp(&a.2).then(b.1.cmp(&a.1)).then(a.0.cmp(&b.0)));

        if selected.is_empty() {
            return Ok(ranked
                .into_iter()
                .map(|(tag, count, _)| HashtagEntry { tag, count })
                .collect());
        }

        let mut result: Vec<HashtagEntry> = selected
            .iter()
            .map(|tag| HashtagEntry {
                tag: tag.clone(),
                count: totals.get(tag).copied().unwrap_or(0),
            })
            .collect();
        result.extend(
            ranked
                .into_iter()
                .filter(|(tag, _, _)| !selected.contains(tag))
                .map(|(tag, count, _)| HashtagEntry { tag, count }),
        );
        Ok(result)
    }

    /// Full, idempotent reconstruction from the system of record.
    ///
    /// Clears every cache collection, then replays all messages: all-time
    /// sets and lifetime counters cover the entire history, while the
    /// time-scored collections only take entries inside their windows.
    /// Returns the number of messages replayed.
    ///
    /// # Errors
    /// Any store or source failure aborts the rebuild; the process must not
    /// serve trending reads from a partially rebuilt cache.
    #[instrument(name = "cache.rebuild", skip(self, messages), err)]
    pub async fn rebuild<S>(&self, messages: S, now: &DateTime<Utc>) -> Result<u64, RebuildError>
    where
        S: Stream<Item = Result<plaza_shared::Message, RepositoryError>> + Send,
    {
        for key in [
            HASHTAG_ACTIVITY,
            ALL_HASHTAGS,
            HASHTAG_COUNTS,
            TERM_ACTIVITY,
            ALL_TERMS,
        ] {
            self.store.del(key).await.map_err(CacheError::from)?;
        }

        let hashtag_cutoff = *now - self.trending_window;
        let term_cutoff = *now - self.term_retention;

        let mut lifetime_counts: HashMap<String, i64> = HashMap::new();
        let mut replayed: u64 = 0;

        let mut messages = std::pin::pin!(messages);
        while let Some(message) = messages.next().await {
            let message = message?;
            let score = message.created_at.0.timestamp() as f64;

            for tag in text::extract_hashtags(&message.content) {
                self.store
                    .sadd(ALL_HASHTAGS, &tag)
                    .await
                    .map_err(CacheError::from)?;
                *lifetime_counts.entry(tag.clone()).or_insert(0) += 1;

                if message.created_at.0 >= hashtag_cutoff {
                    let member = format!("{tag}:{}", message.id);
                    self.store
                        .zadd(HASHTAG_ACTIVITY, &member, score)
                        .await
                        .map_err(CacheError::from)?;
                }
            }

            for term in text::extract_terms(&message.content) {
                self.store
                    .sadd(ALL_TERMS, &term)
                    .await
                    .map_err(CacheError::from)?;

                if message.created_at.0 >= term_cutoff {
                    let member = format!("{term}:{}", message.id);
                    self.store
                        .zadd(TERM_ACTIVITY, &member, score)
                        .await
                        .map_err(CacheError::from)?;
                }
            }

            replayed += 1;
        }

        let entries: Vec<(String, i64)> = lifetime_counts.into_iter().collect();
        self.store
            .hset_all(HASHTAG_COUNTS, &entries)
            .await
            .map_err(CacheError::from)?;

        info!(messages = replayed, "activity cache rebuilt");
        Ok(replayed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryActivityStore;
    use chrono::TimeZone;
    use futures::stream;
    use plaza_shared::{Message, Timestamp};

    fn cache_over(store: Arc<MemoryActivityStore>) -> ActivityCache {
        ActivityCache::new(store, &FeedConfig::default())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn message(id: i64, content: &str, created_at: DateTime<Utc>) -> Message {
        Message {
            id,
            author_id: 1,
            author: "ada@example.edu".into(),
            content: content.into(),
            created_at: Timestamp(created_at),
            parent_id: None,
        }
    }

    #[tokio::test]
    async fn recorded_tags_show_up_in_trending_counts() {
        let cache = cache_over(Arc::new(MemoryActivityStore::new()));
        let now = now();

        cache
            .record_activity(
                &["ai".into(), "ml".into()],
                &["neurips".into()],
                1,
                &now,
            )
            .await
            .unwrap();
        cache
            .record_activity(&["ml".into()], &[], 2, &now)
            .await
            .unwrap();

        let trending = cache.trending_counts(&now).await.unwrap();
        assert_eq!(trending.get("ai"), Some(&1));
        assert_eq!(trending.get("ml"), Some(&2));
    }

    #[tokio::test]
    async fn pruning_respects_the_window_boundary() {
        let cache = cache_over(Arc::new(MemoryActivityStore::new()));
        let now = now();

        let inside = now - Duration::seconds(3_600 - 1);
        let outside = now - Duration::seconds(3_600 + 1);
        cache
            .record_activity(&["fresh".into()], &[], 1, &inside)
            .await
            .unwrap();
        cache
            .record_activity(&["stale".into()], &[], 2, &outside)
            .await
            .unwrap();

        let trending = cache.trending_counts(&now).await.unwrap();
        assert_eq!(trending.get("fresh"), Some(&1));
        assert_eq!(trending.get("stale"), None);
    }

    #[tokio::test]
    async fn hashtag_ordering_is_trending_then_total_then_name() {
        let store = Arc::new(MemoryActivityStore::new());
        let cache = cache_over(store.clone());
        let now = now();
        let old = now - Duration::seconds(7_200);

        // a: trending 0; b and c: trending 2 each.
        cache
            .record_activity(&["a".into()], &[], 1, &old)
            .await
            .unwrap();
        cache
            .record_activity(&["b".into()], &[], 10, &now)
            .await
            .unwrap();
        cache
            .record_activity(&["b".into()], &[], 11, &now)
            .await
            .unwrap();
        cache
            .record_activity(&["c".into()], &[], 20, &now)
            .await
            .unwrap();
        cache
            .record_activity(&["c".into()], &[], 21, &now)
            .await
            .unwrap();
        // Lifetime counts diverge from the window: a=5, b=1, c=3.
        store
            .hset_all(
                "hashtag_counts",
                &[("a".into(), 5), ("b".into(), 1), ("c".into(), 3)],
            )
            .await
            .unwrap();

        let list = cache.list_hashtags(&[], &now).await.unwrap();
        let tags: Vec<&str> = list.iter().map(|entry| entry.tag.as_str()).collect();
        assert_eq!(tags, vec!["c", "b", "a"]);

        let list = cache.list_hashtags(&["a".into()], &now).await.unwrap();
        let tags: Vec<&str> = list.iter().map(|entry| entry.tag.as_str()).collect();
        assert_eq!(tags, vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn unknown_selected_tags_appear_first_with_zero_count() {
        let cache = cache_over(Arc::new(MemoryActivityStore::new()));
        let now = now();
        cache
            .record_activity(&["ml".into()], &[], 1, &now)
            .await
            .unwrap();

        let list = cache
            .list_hashtags(&["ghost".into()], &now)
            .await
            .unwrap();
        assert_eq!(list[0], HashtagEntry { tag: "ghost".into(), count: 0 });
        assert_eq!(list[1].tag, "ml");
    }

    #[tokio::test]
    async fn rebuild_matches_incremental_lifetime_counts() {
        let now = now();
        let messages = vec![
            message(1, "intro to #ml research", now - Duration::seconds(30)),
            message(2, "more #ml and #ai talks", now - Duration::seconds(20)),
            message(3, "ancient #ml post", now - Duration::days(30)),
        ];

        // Incremental path.
        let incremental = cache_over(Arc::new(MemoryActivityStore::new()));
        for msg in &messages {
            incremental
                .record_activity(
                    &text::extract_hashtags(&msg.content),
                    &text::extract_terms(&msg.content),
                    msg.id,
                    &msg.created_at.0,
                )
                .await
                .unwrap();
        }

        // Rebuild path over the same history.
        let store = Arc::new(MemoryActivityStore::new());
        let rebuilt = cache_over(store.clone());
        let replayed = rebuilt
            .rebuild(stream::iter(messages.clone().into_iter().map(Ok)), &now)
            .await
            .unwrap();
        assert_eq!(replayed, 3);

        let lifetime = store.hgetall("hashtag_counts").await.unwrap();
        assert_eq!(lifetime.get("ml"), Some(&3));
        assert_eq!(lifetime.get("ai"), Some(&1));

        // The month-old message counts toward lifetime but not trending.
        let trending = rebuilt.trending_counts(&now).await.unwrap();
        assert_eq!(trending.get("ml"), Some(&2));
        assert_eq!(trending.get("ai"), Some(&1));
    }

    #[tokio::test]
    async fn rebuild_is_idempotent() {
        let now = now();
        let messages = vec![
            message(1, "#rust all the way", now - Duration::seconds(10)),
            message(2, "#rust and #async", now - Duration::seconds(5)),
        ];

        let store = Arc::new(MemoryActivityStore::new());
        let cache = cache_over(store.clone());

        cache
            .rebuild(stream::iter(messages.clone().into_iter().map(Ok)), &now)
            .await
            .unwrap();
        let first_counts = store.hgetall("hashtag_counts").await.unwrap();
        let first_activity = store.zrange_all("hashtag_activity").await.unwrap();

        cache
            .rebuild(stream::iter(messages.into_iter().map(Ok)), &now)
            .await
            .unwrap();
        let second_counts = store.hgetall("hashtag_counts").await.unwrap();
        let second_activity = store.zrange_all("hashtag_activity").await.unwrap();

        assert_eq!(first_counts, second_counts);
        assert_eq!(first_activity, second_activity);
    }

    #[tokio::test]
    async fn terms_are_retained_longer_than_hashtags() {
        let now = now();
        let messages = vec![message(
            1,
            "#ml neurips presentation",
            now - Duration::seconds(7_200),
        )];

        let store = Arc::new(MemoryActivityStore::new());
        let cache = cache_over(store.clone());
        cache
            .rebuild(stream::iter(messages.into_iter().map(Ok)), &now)
            .await
            .unwrap();

        // Two hours old: outside the 1 h hashtag window, inside the 24 h
        // term horizon.
        assert!(store.zrange_all("hashtag_activity").await.unwrap().is_empty());
        let terms = store.zrange_all("term_activity").await.unwrap();
        assert!(terms.iter().any(|member| member.starts_with("neurips:")));
    }
}
