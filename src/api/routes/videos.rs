//! Video ledger handlers.

use super::{MAX_VIDEO_PAGE, VideoListQuery, VideoListResponse};
use crate::api::AppState;
use crate::db::Video;
use crate::error::Error;
use axum::{
    Json,
    extract::{Path, Query, State},
};

/// GET /videos - Page through the ledger, newest first
#[utoipa::path(
    get,
    path = "/api/v1/videos",
    tag = "videos",
    params(
        ("page" = Option<i64>, Query, description = "Page number starting at 1"),
        ("page_size" = Option<i64>, Query, description = "Items per page (1-100)")
    ),
    responses(
        (status = 200, description = "One page of videos", body = VideoListResponse),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<VideoListQuery>,
) -> Result<Json<VideoListResponse>, Error> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query
        .page_size
        .unwrap_or(MAX_VIDEO_PAGE)
        .clamp(1, MAX_VIDEO_PAGE);

    let videos = state.downloader.db.list_videos(page, page_size).await?;
    let total = state.downloader.db.count_videos().await?;

    Ok(Json(VideoListResponse {
        videos,
        total,
        page,
        page_size,
    }))
}

/// GET /videos/:bvid - One ledger record
#[utoipa::path(
    get,
    path = "/api/v1/videos/{bvid}",
    tag = "videos",
    params(
        ("bvid" = String, Path, description = "Video bvid")
    ),
    responses(
        (status = 200, description = "Ledger record", body = Video),
        (status = 404, description = "Video not in the ledger", body = crate::error::ApiError)
    )
)]
pub async fn get_video(
    State(state): State<AppState>,
    Path(bvid): Path<String>,
) -> Result<Json<Video>, Error> {
    state
        .downloader
        .db
        .get_video(&bvid)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("video {}", bvid)))
}
