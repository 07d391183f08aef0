//! The trending-hashtag sidebar.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use metrics::counter;
use plaza_shared::HashtagEntry;
use serde::Deserialize;
use tracing::warn;

use super::parse_tags;
use crate::app_state::AppState;

/// Query parameters for the hashtag sidebar. `tags` is comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct HashtagQuery {
    /// Currently selected tags, surfaced at the top of the listing.
    pub tags: Option<String>,
}

/// Every known hashtag with lifetime counts, trending-first. A sick cache
/// degrades to an empty listing rather than an error banner.
pub async fn list_hashtags(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashtagQuery>,
) -> Json<Vec<HashtagEntry>> {
    let selected = parse_tags(query.tags.as_deref());
    match state.cache.list_hashtags(&selected, &Utc::now()).await {
        Ok(entries) => Json(entries),
        Err(err) => {
            counter!("plaza_cache_degraded_total").increment(1);
            warn!(error = %err, "hashtag listing degraded to empty");
            Json(Vec::new())
        }
    }
}
