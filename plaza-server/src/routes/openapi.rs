use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

use crate::handlers::feed::{PostMessageRequest, PostMessageResponse};

/// API schema document for the feed surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Plaza API",
        description = "Conference town-square feed: live fan-out, trending hashtags, threaded conversations."
    ),
    components(schemas(
        PostMessageRequest,
        PostMessageResponse,
        plaza_shared::FeedFragment,
        plaza_shared::FeedItem,
        plaza_shared::FeedPage,
        plaza_shared::HashtagEntry,
        plaza_shared::NotificationIntent,
        plaza_shared::NotificationKind,
        plaza_shared::Identity,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Serve the OpenAPI document. No bundled UI; presentation is external.
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/api/openapi.json", get(openapi_json))
}
