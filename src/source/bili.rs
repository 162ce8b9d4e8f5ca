//! bilibili web API client

use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::wbi::WbiKeys;
use super::{ContentSource, FavlistMedia, FavlistPage, VideoPart, VideoStream};
use crate::config::SourceConfig;
use crate::error::{Error, Result, SourceError};

/// Standard `{code, message, data}` response wrapper
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct FavlistData {
    info: FavlistInfo,
    #[serde(default)]
    medias: Option<Vec<FavlistMedia>>,
}

#[derive(Debug, Deserialize)]
struct FavlistInfo {
    #[serde(default)]
    media_count: u32,
}

#[derive(Debug, Deserialize)]
struct NavData {
    wbi_img: WbiImg,
}

#[derive(Debug, Deserialize)]
struct WbiImg {
    img_url: String,
    sub_url: String,
}

/// How long fetched WBI keys are trusted before the nav endpoint is asked again
const WBI_KEY_TTL: Duration = Duration::from_secs(60 * 60);

/// playurl codes returned when the `w_rid` signature no longer matches the published keys
const REJECTED_SIGNATURE_CODES: [i64; 2] = [-352, -403];

struct CachedKeys {
    keys: WbiKeys,
    fetched_at: Instant,
}

/// [`ContentSource`] backed by `api.bilibili.com`
///
/// WBI keys are fetched lazily on the first signed request and refetched once they are older
/// than an hour, or immediately when playurl rejects a signature.
pub struct BiliClient {
    http: reqwest::Client,
    api_base: String,
    wbi_keys: RwLock<Option<CachedKeys>>,
    wbi_ttl: Duration,
}

impl BiliClient {
    /// Build a client with the configured headers, cookies and request timeout
    pub fn new(config: &SourceConfig, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&config.user_agent, "user_agent")?);
        headers.insert(REFERER, header_value(&config.referer, "referer")?);
        if let Some(cookie) = config.cookies.header_value() {
            headers.insert(COOKIE, header_value(&cookie, "cookies")?);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            wbi_keys: RwLock::new(None),
            wbi_ttl: WBI_KEY_TTL,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<Envelope<T>> {
        let url = format!("{}{}?{}", self.api_base, path, query);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::InvalidResponse(format!("HTTP {} from {}", status, path)).into());
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<Envelope<T>>(&body).map_err(|e| {
            Error::Source(SourceError::InvalidResponse(format!(
                "failed to decode {}: {}",
                path, e
            )))
        })
    }

    /// GET an endpoint and unwrap the envelope
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T> {
        let envelope = self.get_json::<T>(path, query).await?;
        if envelope.code != 0 {
            return Err(SourceError::Api {
                code: envelope.code,
                message: envelope.message,
            }
            .into());
        }
        envelope
            .data
            .ok_or_else(|| SourceError::InvalidResponse(format!("{} returned no data", path)).into())
    }

    /// Current WBI keys, fetched again when missing, expired or `force`d
    async fn wbi_keys(&self, force: bool) -> Result<WbiKeys> {
        if !force
            && let Some(cached) = self.wbi_keys.read().await.as_ref()
            && cached.fetched_at.elapsed() < self.wbi_ttl
        {
            return Ok(cached.keys.clone());
        }

        let mut slot = self.wbi_keys.write().await;
        // Another caller may have refreshed while this one waited for the lock
        if !force
            && let Some(cached) = slot.as_ref()
            && cached.fetched_at.elapsed() < self.wbi_ttl
        {
            return Ok(cached.keys.clone());
        }

        let keys = self.fetch_wbi_keys().await?;
        *slot = Some(CachedKeys {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }

    async fn fetch_wbi_keys(&self) -> Result<WbiKeys> {
        // The nav endpoint answers -101 for anonymous sessions but still carries the keys
        let envelope = self
            .get_json::<NavData>("/x/web-interface/nav", "")
            .await?;
        let data = envelope.data.ok_or_else(|| {
            Error::Source(SourceError::InvalidResponse(
                "nav returned no wbi_img".to_string(),
            ))
        })?;
        let keys = WbiKeys::from_urls(&data.wbi_img.img_url, &data.wbi_img.sub_url).ok_or_else(
            || {
                Error::Source(SourceError::InvalidResponse(
                    "malformed wbi_img urls".to_string(),
                ))
            },
        )?;
        tracing::debug!(img_key = %keys.img_key, "fetched WBI keys");
        Ok(keys)
    }

    async fn playurl(&self, keys: &WbiKeys, bvid: &str, cid: i64) -> Result<VideoStream> {
        let params = [
            ("bvid", bvid.to_string()),
            ("cid", cid.to_string()),
            ("fnval", "0".to_string()),
        ];
        let query = keys.sign(&params, chrono::Utc::now().timestamp());
        self.get("/x/player/wbi/playurl", &query).await
    }
}

fn header_value(value: &str, key: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::Config {
        message: format!("invalid header value: {}", e),
        key: Some(format!("source.{}", key)),
    })
}

#[async_trait]
impl ContentSource for BiliClient {
    async fn list_favlist(
        &self,
        favlist_id: i64,
        page_size: u32,
        page: u32,
    ) -> Result<FavlistPage> {
        let query = format!(
            "media_id={}&ps={}&pn={}&platform=web",
            favlist_id, page_size, page
        );
        let data: FavlistData = self.get("/x/v3/fav/resource/list", &query).await?;

        Ok(FavlistPage {
            media_count: data.info.media_count,
            medias: data.medias.unwrap_or_default(),
        })
    }

    async fn resolve_parts(&self, bvid: &str) -> Result<Vec<VideoPart>> {
        let query = format!("bvid={}", urlencoding::encode(bvid));
        self.get("/x/player/pagelist", &query).await
    }

    async fn resolve_stream(&self, bvid: &str, cid: i64) -> Result<VideoStream> {
        let keys = self.wbi_keys(false).await?;
        match self.playurl(&keys, bvid, cid).await {
            Err(Error::Source(SourceError::Api { code, .. }))
                if REJECTED_SIGNATURE_CODES.contains(&code) =>
            {
                tracing::info!(code, bvid, "playurl rejected the WBI signature, refreshing keys");
                let keys = self.wbi_keys(true).await?;
                self.playurl(&keys, bvid, cid).await
            }
            other => other,
        }
    }
}
