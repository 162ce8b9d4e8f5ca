//! favlist-syncer daemon
//!
//! Usage: `favlist-syncer [config.json]`. A missing config file means defaults plus
//! environment overrides.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use favlist_syncer::api::start_api_server;
use favlist_syncer::config::LogConfig;
use favlist_syncer::{BiliClient, Config, ContentSource, Database, Downloader, Watchers};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.json"));
    let config = load_config(&config_path)?;
    init_tracing(&config.log);

    tracing::info!(
        config = %config_path.display(),
        download_dir = %config.download.base_dir.display(),
        database = %config.persistence.database_path.display(),
        "starting favlist-syncer"
    );

    let config = Arc::new(config);
    let db = Arc::new(Database::new(&config.persistence.database_path).await?);
    let source: Arc<dyn ContentSource> =
        Arc::new(BiliClient::new(&config.source, config.download.timeout)?);

    let downloader = Downloader::new(config.clone(), db.clone(), source).await?;
    downloader.start_workers().await;

    let watchers = Watchers::new(downloader.clone())?;
    watchers.start_all().await?;

    let api_shutdown = CancellationToken::new();
    let api = tokio::spawn(start_api_server(
        downloader.clone(),
        watchers.clone(),
        config.clone(),
        api_shutdown.clone(),
    ));

    favlist_syncer::run_with_shutdown(downloader, watchers).await;

    api_shutdown.cancel();
    match api.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "API server failed"),
        Err(e) => tracing::error!(error = %e, "API server task aborted"),
    }

    db.pool().close().await;
    tracing::info!("favlist-syncer stopped");
    Ok(())
}

fn load_config(path: &Path) -> favlist_syncer::Result<Config> {
    if path.exists() {
        return Config::from_file(path);
    }

    let mut config = Config::default();
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    if log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
