//! Server lifecycle: configuration, tracing, pools, the cache rebuild
//! barrier, router assembly, and graceful shutdown.

use std::{
    net::SocketAddr,
    sync::{Arc, OnceLock},
};

use axum::{Extension, Router, response::IntoResponse, routing::get, serve};
use chrono::Utc;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use plaza_shared::config::{Config, LogFormat};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, fmt};

use crate::app_state::AppState;
use crate::middleware::viewer::{self, IdentityProvider, TrustedHeaderProvider};
use crate::repository::{MessageRepository, PgMessageRepository};
use crate::routes;
use crate::services::activity_cache::ActivityCache;
use crate::services::broadcast::FeedBroadcast;
use crate::services::feed_service::FeedService;
use crate::services::thread_service::ThreadService;
use crate::store::{ActivityStore, RedisActivityStore};
use crate::tracer;
use axum::http::{HeaderValue, StatusCode, header};

/// Connection cap for the message store pool.
const DB_MAX_CONNECTIONS: u32 = 10;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Process-wide Prometheus recorder handle.
pub fn metrics_handle() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn metrics_endpoint(Extension(handle): Extension<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        handle.render(),
    )
}

/// Initializes the tracing subscriber for logging using the provided
/// configuration.
pub fn initialize_tracing(config: &Config) -> String {
    let env_filter = build_env_filter(config);

    let fmt_builder = fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    if matches!(config.log_format, LogFormat::Json) {
        fmt_builder.json().with_ansi(false).init();
    } else {
        fmt_builder.with_ansi(true).init();
    }

    config.log_level.clone()
}

fn build_env_filter(config: &Config) -> EnvFilter {
    let default_level = config
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy()
    })
}

/// Creates the message-store connection pool.
///
/// # Errors
/// Returns an error if the database connection pool cannot be created.
pub async fn create_database_pool(config: &Config) -> Result<sqlx::PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(DB_MAX_CONNECTIONS)
        .connect(&config.database_url)
        .await?;
    metrics::gauge!("db_pool_max_connections").set(f64::from(DB_MAX_CONNECTIONS));
    Ok(pool)
}

/// Assembles the application state from its collaborators.
#[must_use]
pub fn create_app_state(
    config: Arc<Config>,
    repo: Arc<dyn MessageRepository>,
    store: Arc<dyn ActivityStore>,
    identity: Arc<dyn IdentityProvider>,
) -> Arc<AppState> {
    let cache = Arc::new(ActivityCache::new(store.clone(), &config.feed));
    let hub = FeedBroadcast::new(store.clone(), config.feed.channel.clone());
    let feed = Arc::new(FeedService::new(repo.clone(), cache.clone(), hub.clone()));
    let threads = Arc::new(ThreadService::new(repo, &config.feed));

    Arc::new(AppState {
        config,
        feed,
        threads,
        cache,
        hub,
        store,
        identity,
    })
}

/// Creates the CORS layer for the application.
#[must_use]
pub fn create_cors_layer() -> CorsLayer {
    use http::Method;

    CorsLayer::new()
        .allow_methods(AllowMethods::list(vec![
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::any())
        .allow_origin(AllowOrigin::any())
}

/// Creates the main application router with all middleware and routes.
#[must_use]
pub fn create_app_router(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_router = routes::feed::create_router_feed().layer(
        axum::middleware::from_fn_with_state(state.identity.clone(), viewer::attach_viewer),
    );

    Router::new()
        .nest("/api", api_router)
        .merge(routes::health::create_health_router())
        .merge(routes::openapi::openapi_routes())
        .route("/metrics", get(metrics_endpoint))
        .layer(Extension(metrics_handle))
        .layer(create_cors_layer())
        .layer(tracer::create_trace_layer())
        .with_state(state)
}

/// Creates the graceful shutdown signal handler.
pub async fn create_shutdown_signal(hub: FeedBroadcast) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutting down...");
    hub.shutdown();
}

/// Starts the server: connects the pools, rebuilds the activity cache to
/// completion, then binds the listener. The rebuild is a startup barrier; no
/// trending read is served from a partially rebuilt cache.
///
/// # Errors
/// Returns an error if any startup step fails.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    initialize_tracing(&config);
    info!("Starting server...");

    let metrics_handle = metrics_handle();
    let config = Arc::new(config);

    let pool = create_database_pool(&config).await?;
    let repo: Arc<dyn MessageRepository> = Arc::new(PgMessageRepository::new(pool));

    let store: Arc<dyn ActivityStore> =
        Arc::new(RedisActivityStore::connect(&config.redis_url).await?);
    let identity: Arc<dyn IdentityProvider> = Arc::new(TrustedHeaderProvider);

    let state = create_app_state(config.clone(), repo.clone(), store, identity);

    info!("Rebuilding activity cache from the message store...");
    let replayed = state
        .cache
        .rebuild(repo.list_all_messages(), &Utc::now())
        .await?;
    info!(messages = replayed, "Activity cache ready");

    let app = create_app_router(state.clone(), metrics_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    let shutdown_signal = create_shutdown_signal(state.hub.clone());

    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}
