//! Worker pool — a fixed number of workers draining the bounded queue.

use crate::types::TaskId;

use super::Downloader;

impl Downloader {
    /// Spawn `download.concurrent` workers
    ///
    /// Each worker waits for the next queued task (or cancellation), runs the download pipeline
    /// in its own tokio task, then sleeps `download.pacing` before taking the next one. A panic
    /// inside a pipeline fails only that task; the worker keeps running, so the pool size stays
    /// constant until shutdown.
    pub async fn start_workers(&self) {
        let mut workers = self.queue.workers.lock().await;
        if !workers.is_empty() {
            tracing::debug!("download workers already running");
            return;
        }

        for worker_id in 0..self.config.download.concurrent {
            let downloader = self.clone();
            workers.push(tokio::spawn(async move {
                downloader.worker_loop(worker_id).await;
            }));
        }

        tracing::info!(
            workers = self.config.download.concurrent,
            pacing_secs = self.config.download.pacing.as_secs(),
            "download workers started"
        );
    }

    async fn worker_loop(&self, worker_id: usize) {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                id = self.next_queued() => id,
            };

            let Some(id) = next else {
                break;
            };

            tracing::debug!(worker_id, task_id = %id, "worker picked up task");
            self.run_isolated(worker_id, id).await;

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.download.pacing) => {}
            }
        }

        tracing::debug!(worker_id, "download worker stopped");
    }

    async fn next_queued(&self) -> Option<TaskId> {
        let mut rx = self.queue.rx.lock().await;
        rx.recv().await
    }

    /// Run one task in a separate tokio task so a panic cannot take the worker down
    async fn run_isolated(&self, worker_id: usize, id: TaskId) {
        let downloader = self.clone();
        let task_id = id.clone();
        let handle = tokio::spawn(async move { downloader.run_task(task_id).await });

        if let Err(e) = handle.await {
            tracing::error!(worker_id, task_id = %id, error = %e, "download task aborted unexpectedly");
            if let Err(e) = self.registry.fail(&id, format!("worker fault: {}", e)).await {
                tracing::debug!(task_id = %id, error = %e, "could not mark aborted task failed");
            }
        }
    }
}
