//! REST API server module
//!
//! A thin HTTP front-end over the scheduler, the ledger and the favlist watchers, plus static
//! serving of the download directory (media files and cached covers).

use crate::{Config, Downloader, Result, Watchers};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Tasks
/// - `GET /api/v1/tasks` - List all tasks
/// - `POST /api/v1/tasks` - Schedule a download
/// - `GET /api/v1/tasks/:id` - Get single task
/// - `GET /api/v1/downloading` - Queued and downloading tasks
/// - `GET /api/v1/downloading/:bvid` - Task currently downloading a video
///
/// ## Ledger
/// - `GET /api/v1/videos` - Page through seen videos
/// - `GET /api/v1/videos/:bvid` - Single video record
/// - `GET /api/v1/favlists` - Watched favlists
/// - `POST /api/v1/favlists` - Register and watch a favlist
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /api/v1/status` - Scheduler and watcher overview
/// - `GET /api/v1/openapi.json` - OpenAPI specification
///
/// ## Static files
/// - `GET /downloads/*` - Files under `download.base_dir`, including `covers/`
pub fn create_router(downloader: Downloader, watchers: Watchers, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, watchers, config.clone());

    let api = Router::new()
        // Tasks
        .route("/tasks", get(routes::list_tasks).post(routes::add_task))
        .route("/tasks/:id", get(routes::get_task))
        .route("/downloading", get(routes::list_active_tasks))
        .route("/downloading/:bvid", get(routes::get_active_task))
        // Ledger
        .route("/videos", get(routes::list_videos))
        .route("/videos/:bvid", get(routes::get_video))
        .route("/favlists", get(routes::list_favlists))
        .route("/favlists", post(routes::add_favlist))
        // System
        .route("/status", get(routes::get_status))
        .route("/openapi.json", get(routes::openapi_spec));

    let router = Router::new()
        .route("/health", get(routes::health_check))
        .nest("/api/v1", api)
        .nest_service("/downloads", ServeDir::new(&config.download.base_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Start the API server on the configured bind address
///
/// Runs until `shutdown` is cancelled, then stops accepting connections and lets in-flight
/// requests finish.
pub async fn start_api_server(
    downloader: Downloader,
    watchers: Watchers,
    config: Arc<Config>,
    shutdown: CancellationToken,
) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(downloader, watchers, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
