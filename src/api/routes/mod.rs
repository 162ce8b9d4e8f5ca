//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] — Download tasks and in-flight lookups
//! - [`videos`] — Ledger of seen videos
//! - [`favlists`] — Watched favlists
//! - [`system`] — Health, status, OpenAPI

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::Video;
use crate::types::TaskId;

mod favlists;
mod system;
mod tasks;
mod videos;

pub use favlists::*;
pub use system::*;
pub use tasks::*;
pub use videos::*;

/// Default and maximum page size of GET /videos
pub const MAX_VIDEO_PAGE: i64 = 100;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /tasks
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddTaskRequest {
    /// Video to download
    pub bvid: String,
    /// Title shown for the task
    #[serde(default)]
    pub title: String,
}

/// Response for POST /tasks
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddTaskResponse {
    /// Id of the created task
    pub task_id: TaskId,
}

/// Query parameters for GET /videos
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct VideoListQuery {
    /// Page number starting at 1 (default: 1)
    pub page: Option<i64>,
    /// Items per page, 1 to 100 (default: 100)
    pub page_size: Option<i64>,
}

/// Response for GET /videos
#[derive(Debug, Serialize, ToSchema)]
pub struct VideoListResponse {
    /// Videos on this page, newest first
    pub videos: Vec<Video>,
    /// Total number of videos in the ledger
    pub total: i64,
    /// Page returned
    pub page: i64,
    /// Page size used
    pub page_size: i64,
}

/// Request body for POST /favlists
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddFavlistRequest {
    /// Favlist id (media_id)
    pub id: i64,
    /// Display name; keeps the stored name when omitted
    #[serde(default)]
    pub name: Option<String>,
}

/// Task counts by status
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct TaskCounts {
    /// All tasks created by this process
    pub total: usize,
    /// Waiting in the queue
    pub queued: usize,
    /// Being transferred
    pub downloading: usize,
    /// Finished successfully
    pub completed: usize,
    /// Finished with an error
    pub failed: usize,
    /// Interrupted by shutdown
    pub canceled: usize,
}

/// Response for GET /status
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct StatusResponse {
    /// Whether new tasks are accepted
    pub running: bool,
    /// Crate version
    pub version: String,
    /// Media download directory
    pub download_dir: String,
    /// Number of download workers
    pub concurrent: usize,
    /// Capacity of the download queue
    pub queue_capacity: usize,
    /// Task counts by status
    pub tasks: TaskCounts,
    /// Favlists with a running sync loop
    pub watched_favlists: Vec<i64>,
}
