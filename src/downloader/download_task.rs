//! Download pipeline for a single task.
//!
//! `Downloading` → resolve parts → resolve stream → transfer (with retry) → `Completed` and
//! ledger update. Source lookups are not retried; their failure ends the task `Failed`.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::TryStreamExt;
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

use crate::error::{DownloadError, Error, Result, SourceError};
use crate::retry::transfer_with_retry;
use crate::types::{Task, TaskId, TaskStatus};

use super::Downloader;

/// Read buffer size for media transfers
const CHUNK_SIZE: usize = 32 * 1024;

fn stalled(url: &str, timeout: Duration) -> Error {
    DownloadError::Stalled {
        url: url.to_string(),
        timeout_ms: timeout.as_millis(),
    }
    .into()
}

impl Downloader {
    /// Local path of the media file for `bvid`
    pub fn media_path(&self, bvid: &str) -> PathBuf {
        self.config
            .download
            .base_dir
            .join(format!("{}.{}", bvid, self.config.download.file_extension))
    }

    /// Run the full pipeline for one task and record its terminal status
    pub(crate) async fn run_task(&self, id: TaskId) {
        let Some(task) = self.registry.get(&id).await else {
            tracing::warn!(task_id = %id, "queued task no longer registered");
            return;
        };

        if self.cancel.is_cancelled() {
            self.mark_canceled(&task).await;
            return;
        }

        match self.execute(&task).await {
            Ok(bytes) => self.complete(&task, bytes).await,
            Err(Error::Cancelled) => self.mark_canceled(&task).await,
            Err(e) => {
                tracing::error!(
                    task_id = %task.id,
                    bvid = %task.bvid,
                    error = %e,
                    "download task failed"
                );
                if let Err(e) = self.registry.fail(&task.id, e.to_string()).await {
                    tracing::warn!(task_id = %task.id, error = %e, "failed to record task failure");
                }
            }
        }
    }

    async fn execute(&self, task: &Task) -> Result<u64> {
        self.registry
            .update_status(&task.id, TaskStatus::Downloading, 0.0)
            .await?;

        let parts = self
            .until_cancelled(self.source.resolve_parts(&task.bvid))
            .await?;
        // Only the first part is downloaded
        let part = parts.first().ok_or_else(|| SourceError::NoParts {
            bvid: task.bvid.clone(),
        })?;

        let stream = self
            .until_cancelled(self.source.resolve_stream(&task.bvid, part.cid))
            .await?;
        let url = stream
            .durl
            .first()
            .map(|segment| segment.url.clone())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SourceError::NoStreamUrl {
                bvid: task.bvid.clone(),
            })?;

        let path = self.media_path(&task.bvid);
        let this = self;
        let task_id = &task.id;
        let url = url.as_str();
        let path = path.as_path();

        transfer_with_retry(
            &self.config.download.retry,
            &self.cancel,
            move |attempt| this.transfer_once(task_id, url, path, attempt),
        )
        .await
    }

    /// One transfer attempt, always starting from byte 0
    async fn transfer_once(&self, id: &TaskId, url: &str, path: &Path, attempt: u32) -> Result<u64> {
        tokio::fs::create_dir_all(&self.config.download.base_dir).await?;
        let mut file = tokio::fs::File::create(path).await?;

        tracing::debug!(task_id = %id, attempt, url, "starting transfer");
        let stall_timeout = self.config.download.timeout;
        let response = tokio::time::timeout(stall_timeout, self.http.get(url).send())
            .await
            .map_err(|_| stalled(url, stall_timeout))??;
        if response.status() != StatusCode::OK {
            return Err(DownloadError::UnexpectedStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            }
            .into());
        }

        let total = response.content_length().filter(|len| *len > 0);
        let body = response.bytes_stream().map_err(std::io::Error::other);
        let mut reader = StreamReader::new(body);
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut downloaded: u64 = 0;

        loop {
            let n = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                read = tokio::time::timeout(stall_timeout, reader.read(&mut buf)) => {
                    read.map_err(|_| stalled(url, stall_timeout))??
                }
            };
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await?;
            downloaded += n as u64;

            if let Some(total) = total {
                let progress = downloaded as f64 / total as f64 * 100.0;
                if let Err(e) = self.registry.update_progress(id, progress).await {
                    tracing::debug!(task_id = %id, error = %e, "progress update skipped");
                }
            }
        }

        file.flush().await?;
        Ok(downloaded)
    }

    async fn complete(&self, task: &Task, bytes: u64) {
        if let Err(e) = self
            .registry
            .update_status(&task.id, TaskStatus::Completed, 100.0)
            .await
        {
            tracing::warn!(task_id = %task.id, error = %e, "failed to mark task completed");
        }
        tracing::info!(
            task_id = %task.id,
            bvid = %task.bvid,
            title = %task.title,
            bytes,
            "download completed"
        );

        // Registry and ledger are not updated atomically; a failed ledger write is only logged
        if let Err(e) = self.db.mark_downloaded(&task.bvid, true).await {
            tracing::error!(bvid = %task.bvid, error = %e, "failed to mark video downloaded in ledger");
            return;
        }

        match self.db.get_video(&task.bvid).await {
            Ok(Some(video)) => tracing::info!(
                bvid = %video.bvid,
                title = %video.title,
                downloaded = video.is_downloaded,
                "ledger record after download"
            ),
            Ok(None) => tracing::warn!(bvid = %task.bvid, "video missing from ledger after download"),
            Err(e) => tracing::warn!(bvid = %task.bvid, error = %e, "failed to re-read ledger record"),
        }
    }

    async fn mark_canceled(&self, task: &Task) {
        let progress = self
            .registry
            .get(&task.id)
            .await
            .map(|t| t.progress)
            .unwrap_or_default();
        match self
            .registry
            .update_status(&task.id, TaskStatus::Canceled, progress)
            .await
        {
            Ok(()) => tracing::info!(task_id = %task.id, bvid = %task.bvid, "download task canceled"),
            Err(e) => tracing::debug!(task_id = %task.id, error = %e, "could not mark task canceled"),
        }
    }

    /// Await `fut` unless cancellation fires first
    async fn until_cancelled<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = fut => result,
        }
    }
}
