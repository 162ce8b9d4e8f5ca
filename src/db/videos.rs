//! Video ledger operations.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, MAX_VIDEO_PAGE_SIZE, Video};

const VIDEO_COLUMNS: &str = "id, bvid, title, cover, created_at, duration, page_count, \
    description, uploader_name, uploader_uid, uploader_face, last_checked_at, favlist_id, \
    is_downloaded, is_invalid, is_removed";

impl Database {
    /// Get a video by bvid
    pub async fn get_video(&self, bvid: &str) -> Result<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE bvid = ?"
        ))
        .bind(bvid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get video: {}",
                e
            )))
        })?;

        Ok(video)
    }

    /// Insert a video, replacing any row with the same bvid
    ///
    /// `video.id` is ignored; the replaced row gets a fresh id.
    pub async fn insert_or_replace_video(&self, video: &Video) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO videos
                (bvid, title, cover, created_at, duration, page_count, description,
                 uploader_name, uploader_uid, uploader_face, last_checked_at, favlist_id,
                 is_downloaded, is_invalid, is_removed)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&video.bvid)
        .bind(&video.title)
        .bind(&video.cover)
        .bind(video.created_at)
        .bind(video.duration)
        .bind(video.page_count)
        .bind(&video.description)
        .bind(&video.uploader_name)
        .bind(video.uploader_uid)
        .bind(&video.uploader_face)
        .bind(video.last_checked_at)
        .bind(video.favlist_id)
        .bind(video.is_downloaded)
        .bind(video.is_invalid)
        .bind(video.is_removed)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert video: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// List videos newest first
    ///
    /// `page` below 1 is treated as 1; `page_size` outside `1..=10000` becomes 10000.
    pub async fn list_videos(&self, page: i64, page_size: i64) -> Result<Vec<Video>> {
        let page = page.max(1);
        let page_size = if page_size <= 0 || page_size > MAX_VIDEO_PAGE_SIZE {
            MAX_VIDEO_PAGE_SIZE
        } else {
            page_size
        };
        let offset = (page - 1).saturating_mul(page_size);

        let videos = sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list videos: {}",
                e
            )))
        })?;

        Ok(videos)
    }

    /// Count all videos in the ledger
    pub async fn count_videos(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count videos: {}",
                    e
                )))
            })?;

        Ok(count)
    }

    /// Set the downloaded flag for a video
    ///
    /// Returns `DatabaseError::NotFound` when no row has this bvid.
    pub async fn mark_downloaded(&self, bvid: &str, downloaded: bool) -> Result<()> {
        let result = sqlx::query("UPDATE videos SET is_downloaded = ? WHERE bvid = ?")
            .bind(downloaded)
            .bind(bvid)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update downloaded flag: {}",
                    e
                )))
            })?;

        if result.rows_affected() == 0 {
            return Err(Error::Database(DatabaseError::NotFound(format!(
                "video {}",
                bvid
            ))));
        }

        Ok(())
    }
}
