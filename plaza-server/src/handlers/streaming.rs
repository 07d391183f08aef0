//! Live update stream.
//!
//! Each request spins up one live session subscribed to the broadcast hub;
//! its output channel backs the SSE body. Dropping the response (client
//! disconnect) closes the channel and ends the session task.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    Extension,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::info;

use super::parse_tags;
use crate::app_state::AppState;
use crate::http::error::ApiError;
use crate::middleware::viewer::ViewerContext;
use crate::services::live_session::{LiveSession, SessionEvent};

/// Outbound buffer per live session; backpressure beyond this drops the
/// session rather than the process.
const SESSION_CHANNEL_CAPACITY: usize = 64;

/// Query parameters of the live stream. `tags` is comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    /// Hashtag filters applied server-side for this session.
    pub tags: Option<String>,
    /// Case-insensitive content filter.
    pub search: Option<String>,
}

/// Server-sent events stream of rendered fragments and notifications.
pub async fn stream_feed(
    State(state): State<Arc<AppState>>,
    Extension(ViewerContext(viewer)): Extension<ViewerContext>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    info!(viewer = ?viewer.as_ref().map(|v| v.id), "establishing live session");

    let session = LiveSession::new(
        viewer,
        parse_tags(query.tags.as_deref()),
        query.search.clone(),
    );
    let receiver = session
        .spawn(&state.hub, SESSION_CHANNEL_CAPACITY)
        .await?;

    let stream = ReceiverStream::new(receiver).map(|event| {
        let event = match event {
            SessionEvent::Fragment(fragment) => sse_event("message", &fragment),
            SessionEvent::Notification(intent) => sse_event("notification", &intent),
        };
        Ok::<_, Infallible>(event)
    });

    let keepalive = KeepAlive::new()
        .interval(Duration::from_secs(state.config.feed.sse_keepalive_secs.max(5)))
        .text("keep-alive");

    Ok(Sse::new(stream).keep_alive(keepalive))
}

fn sse_event<T: Serialize>(name: &str, payload: &T) -> Event {
    match serde_json::to_string(payload) {
        Ok(data) => Event::default().event(name).data(data),
        Err(_) => Event::default().event("error").data("{}"),
    }
}
