//! Shutdown coordination.

use crate::types::TaskStatus;

use super::Downloader;

impl Downloader {
    /// Gracefully shut down the downloader
    ///
    /// 1. Stops accepting new tasks
    /// 2. Cancels the process-wide token (workers stop at their next wait, transfers at the
    ///    next chunk or attempt boundary)
    /// 3. Waits for every worker to exit
    /// 4. Closes the queue and marks tasks still waiting in it `Canceled`
    ///
    /// Calling it again is harmless.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating downloader shutdown");

        self.queue
            .accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);
        self.cancel.cancel();

        let handles: Vec<_> = {
            let mut workers = self.queue.workers.lock().await;
            workers.drain(..).collect()
        };
        let worker_count = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "download worker exited abnormally");
            }
        }
        tracing::info!(worker_count, "All download workers stopped");

        // Workers are gone, so nothing else holds the receiver now
        let mut drained = 0usize;
        {
            let mut rx = self.queue.rx.lock().await;
            rx.close();
            while let Ok(id) = rx.try_recv() {
                match self.registry.update_status(&id, TaskStatus::Canceled, 0.0).await {
                    Ok(()) => drained += 1,
                    Err(e) => tracing::debug!(task_id = %id, error = %e, "could not cancel queued task"),
                }
            }
        }

        tracing::info!(drained, "Downloader shutdown complete");
    }
}
