//! Database layer for favlist-syncer
//!
//! The persisted item ledger: one row per watched favlist and one row per video ever seen,
//! keyed by bvid. The `is_downloaded` flag is what makes the sync loop resumable across
//! restarts.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`videos`] — Video records and download flag
//! - [`favlists`] — Watched favlist records

use serde::Serialize;
use sqlx::{FromRow, sqlite::SqlitePool};
use utoipa::ToSchema;

mod favlists;
mod migrations;
mod videos;

/// Upper bound on one page of [`Database::list_videos`]
pub const MAX_VIDEO_PAGE_SIZE: i64 = 10_000;

/// Watched favlist record
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, ToSchema)]
pub struct Favlist {
    /// Favlist id (media_id) on bilibili
    pub id: i64,
    /// Display name
    pub name: String,
    /// Cover image reference
    pub cover: String,
    /// Unix timestamp of the last successful sync cycle
    pub last_checked_at: Option<i64>,
}

impl Favlist {
    /// Favlist that has never been checked
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cover: String::new(),
            last_checked_at: None,
        }
    }
}

/// Video record from the ledger
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, ToSchema)]
pub struct Video {
    /// Row id (assigned by SQLite, ignored on insert)
    pub id: i64,
    /// Video identifier
    pub bvid: String,
    /// Title at the time the video was first seen
    pub title: String,
    /// Cover reference; either the remote URL or the locally cached path
    pub cover: String,
    /// Unix timestamp when the video was added to the favlist
    pub created_at: i64,
    /// Duration in seconds
    pub duration: i64,
    /// Number of parts
    pub page_count: i64,
    /// Description text
    pub description: String,
    /// Uploader display name
    pub uploader_name: String,
    /// Uploader user id
    pub uploader_uid: i64,
    /// Uploader avatar URL
    pub uploader_face: String,
    /// Unix timestamp of the sync cycle that last wrote this row
    pub last_checked_at: i64,
    /// Favlist the video was discovered in
    pub favlist_id: i64,
    /// Media file fully written to disk
    pub is_downloaded: bool,
    /// Marked unavailable upstream (stored only)
    pub is_invalid: bool,
    /// Removed from the favlist upstream (stored only)
    pub is_removed: bool,
}

/// Database handle for favlist-syncer
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
