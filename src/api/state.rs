//! Application state for the API server

use crate::{Config, Downloader, Watchers};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Scheduler, task registry and ledger
    pub downloader: Downloader,

    /// Running favlist sync loops
    pub watchers: Watchers,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Downloader, watchers: Watchers, config: Arc<Config>) -> Self {
        Self {
            downloader,
            watchers,
            config,
        }
    }
}
