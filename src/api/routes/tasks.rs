//! Download task handlers.

use super::{AddTaskRequest, AddTaskResponse};
use crate::api::AppState;
use crate::error::{ApiError, DownloadError, Error};
use crate::types::{Task, TaskId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /tasks - List every task created by this process
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "All tasks, oldest first", body = Vec<Task>)
    )
)]
pub async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    Json(state.downloader.list_tasks().await)
}

/// GET /tasks/:id - Get a single task
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task snapshot", body = Task),
        (status = 404, description = "Task not found", body = ApiError)
    )
)]
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, Error> {
    let id = TaskId::from(id);
    state
        .downloader
        .get_task(&id)
        .await
        .map(Json)
        .ok_or(Error::Download(DownloadError::TaskNotFound { id }))
}

/// POST /tasks - Schedule a download
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    tag = "tasks",
    request_body = AddTaskRequest,
    responses(
        (status = 201, description = "Task queued", body = AddTaskResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 409, description = "Video already queued or downloading", body = ApiError),
        (status = 503, description = "Queue full or shutting down", body = ApiError)
    )
)]
pub async fn add_task(
    State(state): State<AppState>,
    Json(request): Json<AddTaskRequest>,
) -> Response {
    let bvid = request.bvid.trim();
    if bvid.is_empty() {
        return ApiError::validation("bvid must not be empty").into_response();
    }

    match state.downloader.add_task(bvid, &request.title).await {
        Ok(task_id) => (StatusCode::CREATED, Json(AddTaskResponse { task_id })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /downloading - Tasks that are queued or downloading
#[utoipa::path(
    get,
    path = "/api/v1/downloading",
    tag = "tasks",
    responses(
        (status = 200, description = "Active tasks", body = Vec<Task>)
    )
)]
pub async fn list_active_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    Json(state.downloader.list_active_tasks().await)
}

/// GET /downloading/:bvid - The task currently downloading a video
#[utoipa::path(
    get,
    path = "/api/v1/downloading/{bvid}",
    tag = "tasks",
    params(
        ("bvid" = String, Path, description = "Video bvid")
    ),
    responses(
        (status = 200, description = "Downloading task", body = Task),
        (status = 404, description = "Video is not downloading", body = ApiError)
    )
)]
pub async fn get_active_task(
    State(state): State<AppState>,
    Path(bvid): Path<String>,
) -> Result<Json<Task>, Error> {
    state
        .downloader
        .active_task_by_bvid(&bvid)
        .await
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("no download in progress for {}", bvid)))
}
