//! Favlist sync loops.
//!
//! - [`favlist`] - One periodic sync loop per favlist
//! - [`cover`] - Best-effort cover image cache used by new videos
//!
//! [`Watchers`] is the set of running loops. Its cancellation token is a child of the
//! downloader's, so shutting the downloader down also stops every loop.

mod cover;
mod favlist;


use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::db::Favlist;
use crate::downloader::Downloader;
use crate::error::Result;

use cover::CoverCache;
pub use favlist::FavlistWatcher;

/// The set of running favlist sync loops
#[derive(Clone)]
pub struct Watchers {
    downloader: Downloader,
    covers: CoverCache,
    cancel: CancellationToken,
    running: Arc<Mutex<HashMap<i64, JoinHandle<()>>>>,
}

impl Watchers {
    /// Create an empty set bound to `downloader`
    pub fn new(downloader: Downloader) -> Result<Self> {
        let covers = CoverCache::new(&downloader.config)?;
        let cancel = downloader.cancellation_token().child_token();
        Ok(Self {
            downloader,
            covers,
            cancel,
            running: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// A watcher for `favlist_id` that is not spawned
    pub fn watcher(&self, favlist_id: i64) -> FavlistWatcher {
        FavlistWatcher::new(favlist_id, self.downloader.clone(), self.covers.clone())
    }

    /// Start one loop for every favlist in the ledger, returning how many were started
    pub async fn start_all(&self) -> Result<usize> {
        let favlists = self.downloader.db.list_favlists().await?;
        let mut started = 0;
        for favlist in &favlists {
            if self.watch(favlist.id).await {
                started += 1;
            }
        }
        tracing::info!(favlists = favlists.len(), started, "favlist watchers started");
        Ok(started)
    }

    /// Start a loop for `favlist_id` unless one is already running
    ///
    /// Returns `false` when the favlist is already watched or shutdown has begun.
    pub async fn watch(&self, favlist_id: i64) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }

        let mut running = self.running.lock().await;
        if running
            .get(&favlist_id)
            .is_some_and(|handle| !handle.is_finished())
        {
            tracing::debug!(favlist_id, "favlist already watched");
            return false;
        }

        let watcher = self.watcher(favlist_id);
        let cancel = self.cancel.clone();
        running.insert(favlist_id, tokio::spawn(watcher.run(cancel)));
        true
    }

    /// Record a favlist in the ledger and start watching it
    ///
    /// An existing row keeps its cover and last check time. Without a name, the stored name
    /// (or `favlist <id>`) is used.
    pub async fn register_favlist(&self, favlist_id: i64, name: Option<String>) -> Result<Favlist> {
        let favlist = match self.downloader.db.get_favlist(favlist_id).await? {
            Some(existing) => Favlist {
                name: name.unwrap_or(existing.name),
                ..existing
            },
            None => Favlist::new(
                favlist_id,
                name.unwrap_or_else(|| format!("favlist {}", favlist_id)),
            ),
        };
        self.downloader.db.insert_or_replace_favlist(&favlist).await?;

        let started = self.watch(favlist_id).await;
        tracing::info!(favlist_id, name = %favlist.name, started, "favlist registered");
        Ok(favlist)
    }

    /// Ids of favlists with a running loop, ascending
    pub async fn watched(&self) -> Vec<i64> {
        let running = self.running.lock().await;
        let mut ids: Vec<i64> = running
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Stop every loop and wait for them to exit
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let handles: Vec<(i64, JoinHandle<()>)> = {
            let mut running = self.running.lock().await;
            running.drain().collect()
        };
        for (favlist_id, handle) in handles {
            if let Err(e) = handle.await {
                tracing::error!(favlist_id, error = %e, "favlist watcher exited abnormally");
            }
        }

        tracing::info!("favlist watchers stopped");
    }
}
