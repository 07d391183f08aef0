use std::sync::Arc;

use plaza_shared::config::Config;

use crate::middleware::viewer::IdentityProvider;
use crate::services::activity_cache::ActivityCache;
use crate::services::broadcast::FeedBroadcast;
use crate::services::feed_service::FeedService;
use crate::services::thread_service::ThreadService;
use crate::store::ActivityStore;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration.
    pub config: Arc<Config>,
    /// Post path.
    pub feed: Arc<FeedService>,
    /// Thread assembly and feed listing.
    pub threads: Arc<ThreadService>,
    /// Trending and lifetime hashtag data.
    pub cache: Arc<ActivityCache>,
    /// Message-created fan-out.
    pub hub: FeedBroadcast,
    /// Raw activity store handle, used by readiness checks.
    pub store: Arc<dyn ActivityStore>,
    /// Viewer resolution seam.
    pub identity: Arc<dyn IdentityProvider>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish()
    }
}
