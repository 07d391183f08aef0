//! Posting and feed listing.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use plaza_shared::{FeedFilter, FeedPage};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::parse_tags;
use crate::app_state::AppState;
use crate::http::error::{ApiError, AppResult};
use crate::middleware::viewer::ViewerContext;

/// Body of `POST /api/feed/messages`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PostMessageRequest {
    /// Message text, at most 140 weighted characters (URLs weigh one).
    pub content: String,
    /// Parent message id when replying.
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Response of `POST /api/feed/messages`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PostMessageResponse {
    /// Id of the created message.
    pub message_id: i64,
}

/// Create a new message (top-level post or reply). Requires a viewer.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Extension(ViewerContext(viewer)): Extension<ViewerContext>,
    Json(request): Json<PostMessageRequest>,
) -> AppResult<(StatusCode, Json<PostMessageResponse>)> {
    let viewer = viewer.ok_or_else(|| ApiError::unauthorized("sign in to post"))?;
    let message = state
        .feed
        .post_message(&viewer, &request.content, request.parent_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PostMessageResponse {
            message_id: message.id,
        }),
    ))
}

/// Query parameters of the feed listing endpoints. `tags` is comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    /// Comma-separated hashtag filter.
    pub tags: Option<String>,
    /// Case-insensitive substring filter.
    pub search: Option<String>,
    /// `threaded` restricts the listing to top-level posts.
    pub view: Option<String>,
    /// Return messages with `id` strictly below this cursor.
    pub cursor: Option<i64>,
}

impl FeedQuery {
    fn filter(&self) -> FeedFilter {
        FeedFilter {
            tags: parse_tags(self.tags.as_deref()),
            search: self.search.clone().filter(|search| !search.is_empty()),
            top_level_only: self.view.as_deref() == Some("threaded"),
        }
    }
}

/// One page of the feed, newest first, with bounded reply trees.
pub async fn list_feed(
    State(state): State<Arc<AppState>>,
    Extension(ViewerContext(viewer)): Extension<ViewerContext>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<FeedPage>> {
    let page = state
        .threads
        .list_feed(&query.filter(), query.cursor, viewer.as_ref())
        .await?;
    Ok(Json(page))
}
