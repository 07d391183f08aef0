//! Conversation thread view.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use plaza_shared::FeedItem;

use crate::app_state::AppState;
use crate::http::error::AppResult;
use crate::middleware::viewer::ViewerContext;

/// The full conversation containing `message_id`, assembled from its root to
/// the fixed reply depth. The requested node carries `is_focused`.
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Extension(ViewerContext(viewer)): Extension<ViewerContext>,
    Path(message_id): Path<i64>,
) -> AppResult<Json<FeedItem>> {
    let tree = state
        .threads
        .get_thread(message_id, viewer.as_ref())
        .await?;
    Ok(Json(tree))
}
