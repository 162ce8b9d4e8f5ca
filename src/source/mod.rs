//! Content source abstraction
//!
//! The sync loop and the download pipeline only talk to bilibili through [`ContentSource`], so
//! tests can swap in an in-memory source. [`BiliClient`] is the production implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

mod bili;
pub mod wbi;

pub use bili::BiliClient;

/// Uploader of a favlist item
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uploader {
    /// User id
    #[serde(default)]
    pub mid: i64,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Avatar URL
    #[serde(default)]
    pub face: String,
}

/// One entry of a favlist page
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavlistMedia {
    /// Video identifier
    pub bvid: String,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Remote cover URL
    #[serde(default)]
    pub cover: String,
    /// Unix timestamp the video was published
    #[serde(default)]
    pub ctime: i64,
    /// Duration in seconds
    #[serde(default)]
    pub duration: i64,
    /// Number of parts
    #[serde(default)]
    pub page: i64,
    /// Description
    #[serde(default)]
    pub intro: String,
    /// Uploader
    #[serde(default)]
    pub upper: Uploader,
}

/// One page of a favlist listing
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FavlistPage {
    /// Total item count of the favlist
    pub media_count: u32,
    /// Items on this page
    pub medias: Vec<FavlistMedia>,
}

/// A playable part of a video
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPart {
    /// Part id used for stream lookup
    pub cid: i64,
    /// 1-based part number
    #[serde(default)]
    pub page: i64,
    /// Part title
    #[serde(default)]
    pub part: String,
    /// Duration in seconds
    #[serde(default)]
    pub duration: i64,
}

/// One direct URL of a stream
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSegment {
    /// Direct media URL (needs the referer header)
    pub url: String,
    /// Size in bytes when known
    #[serde(default)]
    pub size: i64,
}

/// Resolved stream for one part
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStream {
    /// Direct URLs, first one is used
    #[serde(default)]
    pub durl: Vec<StreamSegment>,
}

/// Remote lookups needed to discover and download favlist items
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// List one page of favlist `favlist_id` (1-based `page`)
    async fn list_favlist(&self, favlist_id: i64, page_size: u32, page: u32)
    -> Result<FavlistPage>;

    /// Resolve the parts of a video
    async fn resolve_parts(&self, bvid: &str) -> Result<Vec<VideoPart>>;

    /// Resolve direct stream URLs for one part
    async fn resolve_stream(&self, bvid: &str, cid: i64) -> Result<VideoStream>;
}
