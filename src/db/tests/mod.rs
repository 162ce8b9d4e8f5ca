use crate::db::*;
use tempfile::NamedTempFile;


/// Helper: create a fresh database with migrations applied
async fn setup_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

/// Helper: a video row with sensible defaults
fn sample_video(bvid: &str, created_at: i64) -> Video {
    Video {
        id: 0,
        bvid: bvid.to_string(),
        title: format!("title of {bvid}"),
        cover: format!("https://i0.hdslb.com/{bvid}.jpg"),
        created_at,
        duration: 120,
        page_count: 1,
        description: String::new(),
        uploader_name: "uploader".to_string(),
        uploader_uid: 42,
        uploader_face: String::new(),
        last_checked_at: created_at,
        favlist_id: 7,
        is_downloaded: false,
        is_invalid: false,
        is_removed: false,
    }
}
