//! Shared test helpers for creating Downloader instances in tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;

use crate::config::Config;
use crate::db::{Database, Video};
use crate::downloader::Downloader;
use crate::error::{Result, SourceError};
use crate::source::{
    ContentSource, FavlistMedia, FavlistPage, StreamSegment, Uploader, VideoPart, VideoStream,
};

/// In-memory [`ContentSource`] with scripted favlists, parts and stream URLs
#[derive(Default)]
pub(crate) struct MockSource {
    favlists: Mutex<HashMap<i64, Vec<FavlistMedia>>>,
    failing_pages: Mutex<Vec<u32>>,
    parts: Mutex<HashMap<String, Vec<VideoPart>>>,
    streams: Mutex<HashMap<String, VideoStream>>,
    panicking: Mutex<Vec<String>>,
    pub(crate) list_calls: AtomicUsize,
}

impl MockSource {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the items of a favlist
    pub(crate) fn set_favlist(&self, favlist_id: i64, medias: Vec<FavlistMedia>) {
        self.favlists.lock().unwrap().insert(favlist_id, medias);
    }

    /// Make a page number fail for every favlist
    pub(crate) fn fail_page(&self, page: u32) {
        self.failing_pages.lock().unwrap().push(page);
    }

    /// Make `bvid` resolvable to a single part streaming from `url`
    pub(crate) fn set_playable(&self, bvid: &str, url: &str) {
        self.parts.lock().unwrap().insert(
            bvid.to_string(),
            vec![VideoPart {
                cid: 1000,
                page: 1,
                part: "P1".to_string(),
                duration: 10,
            }],
        );
        self.streams.lock().unwrap().insert(
            bvid.to_string(),
            VideoStream {
                durl: vec![StreamSegment {
                    url: url.to_string(),
                    size: 0,
                }],
            },
        );
    }

    /// Make part resolution for `bvid` panic
    pub(crate) fn set_panicking(&self, bvid: &str) {
        self.panicking.lock().unwrap().push(bvid.to_string());
    }

    /// Give `bvid` parts but an empty stream URL list
    pub(crate) fn set_streamless(&self, bvid: &str) {
        self.set_playable(bvid, "");
        self.streams
            .lock()
            .unwrap()
            .insert(bvid.to_string(), VideoStream { durl: vec![] });
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn list_favlist(&self, favlist_id: i64, page_size: u32, page: u32) -> Result<FavlistPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_pages.lock().unwrap().contains(&page) {
            return Err(SourceError::Api {
                code: -412,
                message: "request was banned".to_string(),
            }
            .into());
        }

        let all = self
            .favlists
            .lock()
            .unwrap()
            .get(&favlist_id)
            .cloned()
            .unwrap_or_default();
        let start = (page.saturating_sub(1) * page_size) as usize;
        let medias = all
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(FavlistPage {
            media_count: all.len() as u32,
            medias,
        })
    }

    async fn resolve_parts(&self, bvid: &str) -> Result<Vec<VideoPart>> {
        if self.panicking.lock().unwrap().iter().any(|b| b == bvid) {
            panic!("part lookup blew up for {bvid}");
        }
        self.parts
            .lock()
            .unwrap()
            .get(bvid)
            .cloned()
            .ok_or_else(|| {
                SourceError::Api {
                    code: -404,
                    message: format!("no such video {bvid}"),
                }
                .into()
            })
    }

    async fn resolve_stream(&self, bvid: &str, _cid: i64) -> Result<VideoStream> {
        self.streams
            .lock()
            .unwrap()
            .get(bvid)
            .cloned()
            .ok_or_else(|| {
                SourceError::Api {
                    code: -404,
                    message: format!("no stream for {bvid}"),
                }
                .into()
            })
    }
}

/// Favlist entry with plausible metadata
pub(crate) fn media(bvid: &str, cover: &str) -> FavlistMedia {
    FavlistMedia {
        bvid: bvid.to_string(),
        title: format!("title of {bvid}"),
        cover: cover.to_string(),
        ctime: 1_700_000_000,
        duration: 60,
        page: 1,
        intro: "intro".to_string(),
        upper: Uploader {
            mid: 7,
            name: "uploader".to_string(),
            face: String::new(),
        },
    }
}

/// Ledger row for `bvid` with the given downloaded flag
pub(crate) fn ledger_video(bvid: &str, downloaded: bool) -> Video {
    Video {
        id: 0,
        bvid: bvid.to_string(),
        title: format!("stored {bvid}"),
        cover: format!("/downloads/covers/{bvid}.jpg"),
        created_at: 1_700_000_000,
        duration: 60,
        page_count: 1,
        description: String::new(),
        uploader_name: "uploader".to_string(),
        uploader_uid: 7,
        uploader_face: String::new(),
        last_checked_at: 1_700_000_000,
        favlist_id: 1,
        is_downloaded: downloaded,
        is_invalid: false,
        is_removed: false,
    }
}

/// Fast configuration rooted in `dir`: no pacing, 20ms backoff, two workers
pub(crate) fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = dir.join("test.db");
    config.download.base_dir = dir.join("downloads");
    config.download.concurrent = 2;
    config.download.pacing = Duration::ZERO;
    config.download.retry.max_attempts = 3;
    config.download.retry.backoff = Duration::from_millis(20);
    config.schedule.sync_interval = Duration::from_millis(50);
    config
}

/// Helper to create a Downloader over `source` with a persistent database and no running workers.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader_with(
    source: Arc<dyn ContentSource>,
    configure: impl FnOnce(&mut Config),
) -> (Downloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    configure(&mut config);

    let db = Database::new(&config.persistence.database_path)
        .await
        .unwrap();

    let downloader = Downloader::new(Arc::new(config), Arc::new(db), source)
        .await
        .unwrap();

    (downloader, temp_dir)
}

/// Helper to create a Downloader with an empty [`MockSource`]
pub(crate) async fn create_test_downloader() -> (Downloader, tempfile::TempDir) {
    create_test_downloader_with(MockSource::new(), |_| {}).await
}

/// Poll until `id` reaches a terminal status or `timeout` elapses
pub(crate) async fn wait_for_terminal(
    downloader: &Downloader,
    id: &crate::types::TaskId,
    timeout: Duration,
) -> crate::types::Task {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let task = downloader.get_task(id).await.unwrap();
        if task.status.is_terminal() || tokio::time::Instant::now() >= deadline {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
