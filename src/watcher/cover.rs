//! Best-effort local cover cache.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};

use crate::config::Config;
use crate::error::{DownloadError, Error, Result};

/// URL prefix under which cached covers are served
const COVER_URL_PREFIX: &str = "/downloads/covers";

/// Downloads cover images into `<base_dir>/covers/<bvid>.jpg`
#[derive(Clone)]
pub(crate) struct CoverCache {
    client: reqwest::Client,
    dir: PathBuf,
}

impl CoverCache {
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&config.source.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        if let Ok(value) = HeaderValue::from_str(&config.source.referer) {
            headers.insert(REFERER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.download.timeout.max(Duration::from_secs(1)))
            .build()?;

        Ok(Self {
            client,
            dir: config.cover_dir(),
        })
    }

    /// Cache the cover at `url` for `bvid` and return the path it is served under
    ///
    /// Any failure yields an empty string; a missing cover never blocks ingestion.
    pub(crate) async fn fetch(&self, bvid: &str, url: &str) -> String {
        if url.is_empty() {
            return String::new();
        }

        match self.download(bvid, url).await {
            Ok(()) => {
                tracing::debug!(bvid, url, "cover cached");
                format!("{}/{}.jpg", COVER_URL_PREFIX, bvid)
            }
            Err(e) => {
                tracing::warn!(bvid, url, error = %e, "failed to cache cover, continuing without it");
                String::new()
            }
        }
    }

    async fn download(&self, bvid: &str, url: &str) -> Result<()> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Download(DownloadError::UnexpectedStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            }));
        }
        let bytes = response.bytes().await?;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(format!("{}.jpg", bvid)), &bytes).await?;
        Ok(())
    }
}
