//! System handlers: health, status, OpenAPI.

use super::{StatusResponse, TaskCounts};
use crate::api::AppState;
use crate::types::TaskStatus;
use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /status - Scheduler and watcher overview
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "system",
    responses(
        (status = 200, description = "Current status", body = StatusResponse)
    )
)]
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let tasks = state.downloader.list_tasks().await;
    let mut counts = TaskCounts {
        total: tasks.len(),
        ..TaskCounts::default()
    };
    for task in &tasks {
        match task.status {
            TaskStatus::Queued => counts.queued += 1,
            TaskStatus::Downloading => counts.downloading += 1,
            TaskStatus::Completed => counts.completed += 1,
            TaskStatus::Failed => counts.failed += 1,
            TaskStatus::Canceled => counts.canceled += 1,
        }
    }

    Json(StatusResponse {
        running: state.downloader.is_accepting(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        download_dir: state.config.download.base_dir.display().to_string(),
        concurrent: state.config.download.concurrent,
        queue_capacity: state.config.download.queue_capacity,
        tasks: counts,
        watched_favlists: state.watchers.watched().await,
    })
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/api/v1/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
