//! Task submission and task lookups.

use std::sync::atomic::Ordering;

use tokio::sync::mpsc::error::TrySendError;

use crate::error::{DownloadError, Error, Result};
use crate::types::{Task, TaskId};

use super::Downloader;

impl Downloader {
    /// Register a task for `bvid` and push it onto the bounded queue
    ///
    /// The cover is copied from the ledger when the video is already known. The push never
    /// blocks: when the queue is full the task is unregistered again and
    /// [`DownloadError::QueueFull`] is returned, so a rejected submission leaves nothing behind.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::AlreadyScheduled`] if the video already has a queued or downloading task
    /// - [`DownloadError::QueueFull`] if the queue is at capacity
    /// - [`Error::ShuttingDown`] once shutdown has started
    pub async fn add_task(&self, bvid: &str, title: &str) -> Result<TaskId> {
        if !self.queue.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let cover = match self.db.get_video(bvid).await {
            Ok(Some(video)) => video.cover,
            Ok(None) => String::new(),
            Err(e) => {
                tracing::debug!(bvid, error = %e, "cover lookup failed, continuing without cover");
                String::new()
            }
        };

        let task = Task::new(bvid, title, cover);
        let id = task.id.clone();
        self.registry.register(task).await?;

        match self.queue.tx.try_send(id.clone()) {
            Ok(()) => {
                tracing::info!(task_id = %id, bvid, title, "download task added");
                Ok(id)
            }
            Err(TrySendError::Full(_)) => {
                self.registry.remove(&id).await;
                let capacity = self.config.download.queue_capacity;
                tracing::warn!(task_id = %id, bvid, capacity, "download queue full, task rejected");
                Err(DownloadError::QueueFull { capacity }.into())
            }
            Err(TrySendError::Closed(_)) => {
                self.registry.remove(&id).await;
                tracing::warn!(task_id = %id, bvid, "download queue closed, task rejected");
                Err(Error::ShuttingDown)
            }
        }
    }

    /// Snapshot of one task
    pub async fn get_task(&self, id: &TaskId) -> Option<Task> {
        self.registry.get(id).await
    }

    /// Snapshot of every task created by this process
    pub async fn list_tasks(&self) -> Vec<Task> {
        self.registry.list().await
    }

    /// Tasks that are queued or downloading
    pub async fn list_active_tasks(&self) -> Vec<Task> {
        self.registry.list_active().await
    }

    /// The task currently downloading `bvid`, if any
    pub async fn active_task_by_bvid(&self, bvid: &str) -> Option<Task> {
        self.registry.active_by_bvid(bvid).await
    }
}
