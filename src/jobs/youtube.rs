//! YouTube Data API client for the latest channel upload.

use std::sync::LazyLock;
use std::time::Duration;

use fancy_regex::Regex;
use serde::Deserialize;
use serenity::async_trait;
use tracing::debug;

use crate::common::error::VideoError;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// A video on the watched channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Video {
    pub id: String,
    pub title: String,
}

impl Video {
    pub fn watch_url(&self) -> String {
        format!("https://youtu.be/{}", self.id)
    }
}

/// Source of the most recent upload.
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn latest_upload(&self) -> Result<Option<Video>, VideoError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
}

/// Queries `search.list` for one channel, newest first.
pub struct YouTubeClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    channel_id: String,
}

impl YouTubeClient {
    pub fn new(client: reqwest::Client, api_base: Option<&str>, api_key: String, channel_id: String) -> Self {
        Self {
            client,
            api_base: api_base
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            channel_id,
        }
    }
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn latest_upload(&self) -> Result<Option<Video>, VideoError> {
        let response = self
            .client
            .get(format!("{}/search", self.api_base))
            .query(&[
                ("part", "snippet"),
                ("channelId", self.channel_id.as_str()),
                ("maxResults", "1"),
                ("order", "date"),
                ("type", "video"),
                ("key", self.api_key.as_str()),
            ])
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VideoError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let search: SearchResponse = serde_json::from_str(&body).map_err(|e| VideoError::Malformed {
            message: e.to_string(),
        })?;

        let Some(item) = search.items.into_iter().next() else {
            debug!("No uploads found for channel {}", self.channel_id);
            return Ok(None);
        };
        let id = item.id.video_id.ok_or_else(|| VideoError::Malformed {
            message: "search result has no videoId".to_string(),
        })?;

        Ok(Some(Video {
            id,
            title: html_escape::decode_html_entities(&item.snippet.title).into_owned(),
        }))
    }
}

/// Watch, shorts and youtu.be URL forms; group 1 is the video id.
static VIDEO_URL_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"youtube\.com/watch\?v=([^\s&#]+)",
        r"youtube\.com/shorts/([^\s&#/]+)",
        r"youtu\.be/([^\s&#?]+)",
    ]
    .map(|pattern| Regex::new(pattern).expect("Video URL pattern will always be valid"))
});

/// Extract the video id from a watch, shorts or youtu.be URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_URL_PATTERNS.iter().find_map(|regex| {
        regex
            .captures(url)
            .ok()
            .flatten()
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Accept either a video URL or a bare id.
pub fn normalize_video_ref(reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    extract_video_id(reference).or_else(|| {
        let bare = !reference.contains('/') && !reference.contains(char::is_whitespace);
        bare.then(|| reference.to_string())
    })
}
