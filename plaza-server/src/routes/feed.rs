use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::app_state::AppState;
use crate::handlers;

/// Routes for the feed surface, mounted under `/api`.
pub fn create_router_feed() -> Router<Arc<AppState>> {
    Router::new()
        .route("/feed", get(handlers::feed::list_feed))
        .route("/feed/messages", post(handlers::feed::post_message))
        .route("/feed/hashtags", get(handlers::hashtags::list_hashtags))
        .route("/feed/thread/{message_id}", get(handlers::thread::get_thread))
        .route("/feed/stream", get(handlers::streaming::stream_feed))
}
