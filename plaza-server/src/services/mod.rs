//! Service layer: the activity cache, broadcast hub, live sessions, thread
//! assembly, and the post path.

pub mod activity_cache;
pub mod broadcast;
pub mod feed_service;
pub mod live_session;
pub mod thread_service;
