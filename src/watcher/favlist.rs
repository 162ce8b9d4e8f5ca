//! Periodic sync of a single favlist.

use std::collections::HashSet;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::db::Video;
use crate::downloader::Downloader;
use crate::error::{DownloadError, Error, Result};
use crate::source::FavlistMedia;
use crate::types::SyncReport;

use super::cover::CoverCache;

/// Sync loop over one favlist
///
/// Every `schedule.sync_interval` the favlist is listed page by page. Videos the ledger has
/// never seen get their cover cached, a ledger row with `is_downloaded = false`, and a download
/// task. Known videos that are still not downloaded and not in flight are resubmitted with their
/// recorded title. Everything else is left alone.
#[derive(Clone)]
pub struct FavlistWatcher {
    favlist_id: i64,
    downloader: Downloader,
    covers: CoverCache,
}

impl FavlistWatcher {
    pub(crate) fn new(favlist_id: i64, downloader: Downloader, covers: CoverCache) -> Self {
        Self {
            favlist_id,
            downloader,
            covers,
        }
    }

    /// Id of the watched favlist
    pub fn favlist_id(&self) -> i64 {
        self.favlist_id
    }

    /// Run sync cycles until `cancel` fires
    ///
    /// The first cycle starts one full interval after the call. Cancellation interrupts both the
    /// wait and a running cycle; an interrupted cycle leaves unsubmitted videos with
    /// `is_downloaded = false`, so the next run picks them up.
    pub async fn run(self, cancel: CancellationToken) {
        let period = self.downloader.config.schedule.sync_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            favlist_id = self.favlist_id,
            interval_secs = period.as_secs(),
            "favlist watcher started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.check_once() => match result {
                    Ok(report) => info!(
                        favlist_id = self.favlist_id,
                        media_count = report.media_count,
                        new = report.new,
                        resumed = report.resumed,
                        skipped = report.skipped,
                        rejected = report.rejected,
                        "favlist sync finished"
                    ),
                    Err(e) => warn!(favlist_id = self.favlist_id, error = %e, "favlist sync failed"),
                },
            }
        }

        info!(favlist_id = self.favlist_id, "favlist watcher stopped");
    }

    /// Run one sync cycle
    ///
    /// # Errors
    ///
    /// Only a failure to fetch the first page fails the cycle. Later page failures are logged
    /// and skipped, as are per-video ledger errors.
    pub async fn check_once(&self) -> Result<SyncReport> {
        let page_size = self.downloader.config.schedule.page_size.max(1);
        debug!(favlist_id = self.favlist_id, page_size, "favlist sync started");

        let first = self
            .downloader
            .source
            .list_favlist(self.favlist_id, page_size, 1)
            .await?;

        let mut report = SyncReport {
            media_count: first.media_count,
            ..SyncReport::default()
        };

        if first.media_count > 0 {
            let pages = first.media_count.div_ceil(page_size);
            let in_flight = self.downloader.registry().in_flight_bvids().await;

            // Every page is fetched again, including the first
            for page in 1..=pages {
                let medias = match self
                    .downloader
                    .source
                    .list_favlist(self.favlist_id, page_size, page)
                    .await
                {
                    Ok(result) => result.medias,
                    Err(e) => {
                        warn!(
                            favlist_id = self.favlist_id,
                            page,
                            error = %e,
                            "failed to fetch favlist page, skipping"
                        );
                        continue;
                    }
                };

                for media in &medias {
                    self.sync_media(media, &in_flight, &mut report).await;
                }
            }
        } else {
            debug!(favlist_id = self.favlist_id, "favlist is empty");
        }

        let now = chrono::Utc::now().timestamp();
        if let Err(e) = self
            .downloader
            .db
            .touch_favlist_checked(self.favlist_id, now)
            .await
        {
            warn!(favlist_id = self.favlist_id, error = %e, "failed to record favlist check time");
        }

        Ok(report)
    }

    async fn sync_media(
        &self,
        media: &FavlistMedia,
        in_flight: &HashSet<String>,
        report: &mut SyncReport,
    ) {
        let bvid = media.bvid.as_str();
        if bvid.is_empty() {
            return;
        }

        let existing = match self.downloader.db.get_video(bvid).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(bvid, error = %e, "ledger lookup failed, skipping video");
                return;
            }
        };

        match existing {
            None => {
                let cover = self.covers.fetch(bvid, &media.cover).await;
                let video = ledger_record(media, self.favlist_id, cover);
                if let Err(e) = self.downloader.db.insert_or_replace_video(&video).await {
                    warn!(bvid, error = %e, "failed to insert ledger record, skipping video");
                    return;
                }
                report.new += 1;
                if !self.submit(bvid, &media.title).await {
                    report.rejected += 1;
                }
            }
            Some(video) if !video.is_downloaded && !in_flight.contains(bvid) => {
                if self.submit(bvid, &video.title).await {
                    report.resumed += 1;
                } else {
                    report.rejected += 1;
                }
            }
            Some(_) => report.skipped += 1,
        }
    }

    /// Submit a download task; `false` when the scheduler refused it
    async fn submit(&self, bvid: &str, title: &str) -> bool {
        match self.downloader.add_task(bvid, title).await {
            Ok(_) => true,
            Err(Error::Download(DownloadError::AlreadyScheduled { task_id, .. })) => {
                debug!(bvid, task_id = %task_id, "video already scheduled");
                false
            }
            Err(e) => {
                warn!(bvid, error = %e, "download task rejected, will retry next cycle");
                false
            }
        }
    }
}

fn ledger_record(media: &FavlistMedia, favlist_id: i64, cover: String) -> Video {
    Video {
        id: 0,
        bvid: media.bvid.clone(),
        title: media.title.clone(),
        cover,
        created_at: media.ctime,
        duration: media.duration,
        page_count: media.page,
        description: media.intro.clone(),
        uploader_name: media.upper.name.clone(),
        uploader_uid: media.upper.mid,
        uploader_face: media.upper.face.clone(),
        last_checked_at: chrono::Utc::now().timestamp(),
        favlist_id,
        is_downloaded: false,
        is_invalid: false,
        is_removed: false,
    }
}
