//! Core downloader implementation split into focused submodules.
//!
//! The `Downloader` struct and its methods are organized by domain:
//! - [`registry`] - In-memory task registry
//! - [`queue`] - Task submission and lookups
//! - [`worker`] - Fixed worker pool consuming the bounded queue
//! - [`download_task`] - Per-task download pipeline and byte transfer
//! - [`lifecycle`] - Shutdown coordination

mod download_task;
mod lifecycle;
mod queue;
pub mod registry;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::source::ContentSource;
use crate::types::TaskId;

pub use registry::TaskRegistry;

/// Bounded FIFO queue and worker bookkeeping
#[derive(Clone)]
pub(crate) struct QueueState {
    /// Submission side of the bounded queue
    pub(crate) tx: mpsc::Sender<TaskId>,
    /// Consumption side, shared by all workers
    pub(crate) rx: Arc<Mutex<mpsc::Receiver<TaskId>>>,
    /// Join handles of the running workers
    pub(crate) workers: Arc<Mutex<Vec<tokio::task::JoinHandle<()>>>>,
    /// Flag to indicate whether new tasks are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Downloader {
    /// Persisted item ledger
    pub db: Arc<Database>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Part and stream lookups
    pub(crate) source: Arc<dyn ContentSource>,
    /// Every task created by this process
    pub(crate) registry: TaskRegistry,
    /// Queue and worker state
    pub(crate) queue: QueueState,
    /// HTTP client for media transfers (browser user agent and referer preset)
    pub(crate) http: reqwest::Client,
    /// Process-wide cancellation signal
    pub(crate) cancel: CancellationToken,
}

impl Downloader {
    /// Create a downloader without starting its workers
    ///
    /// Creates `download.base_dir` if needed. Call [`Downloader::start_workers`] to begin
    /// consuming the queue.
    pub async fn new(
        config: Arc<Config>,
        db: Arc<Database>,
        source: Arc<dyn ContentSource>,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(&config.download.base_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.base_dir.display(),
                        e
                    ),
                ))
            })?;

        let http = build_transfer_client(&config)?;
        let (tx, rx) = mpsc::channel(config.download.queue_capacity.max(1));

        let queue = QueueState {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            workers: Arc::new(Mutex::new(Vec::new())),
            accepting_new: Arc::new(AtomicBool::new(true)),
        };

        Ok(Self {
            db,
            config,
            source,
            registry: TaskRegistry::new(),
            queue,
            http,
            cancel: CancellationToken::new(),
        })
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// The task registry backing this downloader
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Token cancelled when [`Downloader::shutdown`] starts
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether new tasks are still accepted
    pub fn is_accepting(&self) -> bool {
        self.queue
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
    }
}

fn build_transfer_client(config: &Config) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    let user_agent = HeaderValue::from_str(&config.source.user_agent).map_err(|e| Error::Config {
        message: format!("invalid user agent: {}", e),
        key: Some("source.user_agent".to_string()),
    })?;
    let referer = HeaderValue::from_str(&config.source.referer).map_err(|e| Error::Config {
        message: format!("invalid referer: {}", e),
        key: Some("source.referer".to_string()),
    })?;
    headers.insert(USER_AGENT, user_agent);
    headers.insert(REFERER, referer);

    // No overall request timeout: media bodies can take arbitrarily long. Stalls are caught
    // per chunk by the transfer loop.
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(config.download.timeout)
        .build()?;
    Ok(client)
}
