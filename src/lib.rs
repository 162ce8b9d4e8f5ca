//! # favlist-syncer
//!
//! Watches bilibili favorite lists ("favlists") and downloads every newly added video.
//!
//! ## Pieces
//!
//! - [`Watchers`] run one periodic sync loop per favlist. Each cycle lists the favlist, records
//!   unseen videos in the [`Database`] ledger and submits download tasks.
//! - [`Downloader`] owns the task registry, a bounded FIFO queue and a fixed pool of workers.
//!   A worker resolves the video's stream through a [`ContentSource`] and transfers it to
//!   `<base_dir>/<bvid>.<ext>` with a fixed-backoff retry policy.
//! - The ledger's `is_downloaded` flag makes the whole process resumable: anything not marked
//!   downloaded is submitted again by the next sync cycle.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use favlist_syncer::{BiliClient, Config, Database, Downloader, Watchers};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::default());
//!     let db = Arc::new(Database::new(&config.persistence.database_path).await?);
//!     let source = Arc::new(BiliClient::new(&config.source, config.download.timeout)?);
//!
//!     let downloader = Downloader::new(config.clone(), db, source).await?;
//!     downloader.start_workers().await;
//!
//!     let watchers = Watchers::new(downloader.clone())?;
//!     watchers.register_favlist(123456, Some("watch later".to_string())).await?;
//!
//!     favlist_syncer::run_with_shutdown(downloader, watchers).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Persisted item ledger
pub mod db;
/// Task registry, bounded queue and worker pool (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Transfer retry policy
pub mod retry;
/// Content source: favlist listing, part and stream resolution
pub mod source;
/// Core types
pub mod types;
/// Favlist sync loops
pub mod watcher;

// Re-export commonly used types
pub use config::Config;
pub use db::{Database, Favlist, Video};
pub use downloader::{Downloader, TaskRegistry};
pub use error::{
    ApiError, DatabaseError, DownloadError, Error, Result, SourceError, ToHttpStatus,
};
pub use source::{BiliClient, ContentSource};
pub use types::{SyncReport, Task, TaskId, TaskStatus};
pub use watcher::{FavlistWatcher, Watchers};

/// Wait for a termination signal, then stop the watchers and shut the downloader down.
///
/// Watchers go first so no new task is submitted while the pool drains. Returns once every
/// download worker has exited.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(downloader: Downloader, watchers: Watchers) {
    wait_for_signal().await;
    watchers.shutdown().await;
    downloader.shutdown().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
