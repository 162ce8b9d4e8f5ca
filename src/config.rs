//! Configuration types for favlist-syncer

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Download behavior configuration (directory, concurrency, pacing, retry)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory for media files and cached covers (default: "./downloads")
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Number of concurrent download workers (default: 3)
    #[serde(default = "default_concurrent")]
    pub concurrent: usize,

    /// Capacity of the bounded task queue (default: 1000)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Extension of downloaded media files (default: "flv")
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Delay a worker waits after each task before taking the next one (default: 10 seconds)
    #[serde(default = "default_pacing", with = "duration_serde")]
    pub pacing: Duration,

    /// HTTP request timeout for API calls and cover fetches, and the longest a media transfer
    /// may wait for its response or for the next chunk (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Retry policy for the byte transfer step
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            concurrent: default_concurrent(),
            queue_capacity: default_queue_capacity(),
            file_extension: default_file_extension(),
            pacing: default_pacing(),
            timeout: default_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for the transfer step
///
/// The delay between attempts is fixed; it does not grow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between consecutive attempts (default: 2 seconds)
    #[serde(default = "default_backoff", with = "duration_serde")]
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: default_backoff(),
        }
    }
}

/// Login cookies sent with bilibili API requests
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CookieConfig {
    /// `SESSDATA` cookie
    #[serde(default, rename = "SESSDATA")]
    pub sessdata: String,

    /// `bili_jct` cookie
    #[serde(default)]
    pub bili_jct: String,

    /// `DedeUserID` cookie
    #[serde(default, rename = "DedeUserID")]
    pub dede_user_id: String,
}

impl CookieConfig {
    /// Render as a `Cookie` header value, skipping empty entries
    pub fn header_value(&self) -> Option<String> {
        let pairs: Vec<String> = [
            ("SESSDATA", &self.sessdata),
            ("bili_jct", &self.bili_jct),
            ("DedeUserID", &self.dede_user_id),
        ]
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
        .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}

/// Content source (bilibili) configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// API base URL (default: "https://api.bilibili.com")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// User agent for API requests and media transfers
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Referer required by the media CDN to authorize stream URLs
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Login cookies
    #[serde(default)]
    pub cookies: CookieConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            referer: default_referer(),
            cookies: CookieConfig::default(),
        }
    }
}

/// Favlist polling configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Interval between sync cycles of one favlist (default: 300 seconds)
    #[serde(default = "default_sync_interval", with = "duration_serde")]
    pub sync_interval: Duration,

    /// Page size used when listing a favlist (default: 20)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sync_interval: default_sync_interval(),
            page_size: default_page_size(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "favlist.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable permissive CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
        }
    }
}

/// Log output configuration (used by the binary when installing the subscriber)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG` (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Main configuration for favlist-syncer
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Content source settings
    #[serde(default, alias = "bilibili")]
    pub source: SourceConfig,

    /// Favlist polling settings
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Data storage settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Log settings
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a JSON file, apply environment overrides and validate
    ///
    /// Recognized environment variables: `FAVLIST_SESSDATA`, `FAVLIST_BILI_JCT`,
    /// `FAVLIST_DEDE_USER_ID`, `FAVLIST_API_BIND`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let mut config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay settings taken from `FAVLIST_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("FAVLIST_SESSDATA") {
            self.source.cookies.sessdata = v;
        }
        if let Ok(v) = std::env::var("FAVLIST_BILI_JCT") {
            self.source.cookies.bili_jct = v;
        }
        if let Ok(v) = std::env::var("FAVLIST_DEDE_USER_ID") {
            self.source.cookies.dede_user_id = v;
        }
        if let Ok(v) = std::env::var("FAVLIST_API_BIND") {
            self.api.bind_address = v.parse().map_err(|e| Error::Config {
                message: format!("invalid FAVLIST_API_BIND '{v}': {e}"),
                key: Some("api.bind_address".to_string()),
            })?;
        }
        Ok(())
    }

    /// Check invariants the scheduler and sync loops rely on
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| Error::Config {
            message: message.to_string(),
            key: Some(key.to_string()),
        };

        if self.download.concurrent == 0 {
            return Err(invalid(
                "download.concurrent",
                "concurrent downloads must be greater than 0",
            ));
        }
        if self.download.queue_capacity == 0 {
            return Err(invalid(
                "download.queue_capacity",
                "queue capacity must be greater than 0",
            ));
        }
        if self.download.retry.max_attempts == 0 {
            return Err(invalid(
                "download.retry.max_attempts",
                "max attempts must be at least 1",
            ));
        }
        if self.schedule.page_size == 0 {
            return Err(invalid(
                "schedule.page_size",
                "page size must be greater than 0",
            ));
        }
        if self.schedule.sync_interval.is_zero() {
            return Err(invalid(
                "schedule.sync_interval",
                "sync interval must be greater than 0",
            ));
        }
        if url::Url::parse(&self.source.api_base).is_err() {
            return Err(invalid("source.api_base", "api base must be an absolute URL"));
        }
        if self.source.cookies.sessdata.is_empty() {
            tracing::warn!("SESSDATA not configured, bilibili requests run anonymously");
        }
        Ok(())
    }

    /// Directory holding cached cover images
    pub fn cover_dir(&self) -> PathBuf {
        self.download.base_dir.join("covers")
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_concurrent() -> usize {
    3
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_file_extension() -> String {
    "flv".to_string()
}

fn default_pacing() -> Duration {
    Duration::from_secs(10)
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff() -> Duration {
    Duration::from_secs(2)
}

fn default_api_base() -> String {
    "https://api.bilibili.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

fn default_referer() -> String {
    "https://www.bilibili.com/".to_string()
}

fn default_sync_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_page_size() -> u32 {
    20
}

fn default_database_path() -> PathBuf {
    PathBuf::from("favlist.db")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
