//! OpenAPI documentation and schema generation
//!
//! The specification is generated at compile time with utoipa and served at
//! `/api/v1/openapi.json`.

use utoipa::OpenApi;

/// OpenAPI documentation for the favlist-syncer REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "favlist-syncer REST API",
        version = "0.1.0",
        description = "Inspect download tasks, the video ledger and watched bilibili favlists",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    paths(
        // Tasks
        crate::api::routes::list_tasks,
        crate::api::routes::get_task,
        crate::api::routes::add_task,
        crate::api::routes::list_active_tasks,
        crate::api::routes::get_active_task,

        // Videos
        crate::api::routes::list_videos,
        crate::api::routes::get_video,

        // Favlists
        crate::api::routes::list_favlists,
        crate::api::routes::add_favlist,

        // System
        crate::api::routes::health_check,
        crate::api::routes::get_status,
        crate::api::routes::openapi_spec,
    ),
    components(
        schemas(
            crate::types::Task,
            crate::types::TaskId,
            crate::types::TaskStatus,
            crate::db::Video,
            crate::db::Favlist,
            crate::error::ApiError,
            crate::api::routes::AddTaskRequest,
            crate::api::routes::AddTaskResponse,
            crate::api::routes::VideoListResponse,
            crate::api::routes::AddFavlistRequest,
            crate::api::routes::TaskCounts,
            crate::api::routes::StatusResponse,
        )
    ),
    tags(
        (name = "tasks", description = "Download tasks"),
        (name = "videos", description = "Ledger of seen videos"),
        (name = "favlists", description = "Watched favlists"),
        (name = "system", description = "Health, status and API documentation")
    )
)]
pub struct ApiDoc;
