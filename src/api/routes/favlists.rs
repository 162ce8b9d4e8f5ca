//! Watched favlist handlers.

use super::AddFavlistRequest;
use crate::api::AppState;
use crate::db::Favlist;
use crate::error::{ApiError, Error};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /favlists - List watched favlists
#[utoipa::path(
    get,
    path = "/api/v1/favlists",
    tag = "favlists",
    responses(
        (status = 200, description = "Favlists in the ledger", body = Vec<Favlist>),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn list_favlists(State(state): State<AppState>) -> Result<Json<Vec<Favlist>>, Error> {
    Ok(Json(state.downloader.db.list_favlists().await?))
}

/// POST /favlists - Register a favlist and start watching it
#[utoipa::path(
    post,
    path = "/api/v1/favlists",
    tag = "favlists",
    request_body = AddFavlistRequest,
    responses(
        (status = 201, description = "Favlist registered", body = Favlist),
        (status = 400, description = "Invalid request", body = ApiError)
    )
)]
pub async fn add_favlist(
    State(state): State<AppState>,
    Json(request): Json<AddFavlistRequest>,
) -> Response {
    if request.id <= 0 {
        return ApiError::validation("favlist id must be positive").into_response();
    }
    let name = request
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    match state.watchers.register_favlist(request.id, name).await {
        Ok(favlist) => (StatusCode::CREATED, Json(favlist)).into_response(),
        Err(e) => e.into_response(),
    }
}
