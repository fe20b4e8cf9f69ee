//! New upload announcements.

use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use serenity::model::id::ChannelId;
use tracing::{debug, info, warn};

use crate::common::error::StateError;
use crate::discord::platform::ChatPlatform;
use crate::jobs::state::LastSeenStore;
use crate::jobs::youtube::{normalize_video_ref, Video, VideoSource};
use crate::jobs::Job;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnounceOutcome {
    /// The channel has no uploads.
    NoUploads,
    /// Latest upload was already announced.
    Unchanged,
    Announced(Video),
    /// New upload recorded, but the announcement channel did not resolve.
    ChannelMissing(Video),
}

/// Polls for the latest upload and announces it once.
pub struct UploadAnnouncer {
    source: Arc<dyn VideoSource>,
    store: Arc<dyn LastSeenStore>,
    platform: Arc<dyn ChatPlatform>,
    channel: ChannelId,
    format: String,
    interval: Duration,
}

impl UploadAnnouncer {
    pub fn new(
        source: Arc<dyn VideoSource>,
        store: Arc<dyn LastSeenStore>,
        platform: Arc<dyn ChatPlatform>,
        channel: ChannelId,
        format: String,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            platform,
            channel,
            format,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record `reference` (URL or id) as already announced if nothing is stored yet.
    ///
    /// Returns whether the store was written.
    pub async fn seed(&self, reference: &str) -> Result<bool, StateError> {
        let Some(video_id) = normalize_video_ref(reference) else {
            warn!("Ignoring seed video '{}': not a video URL or id", reference);
            return Ok(false);
        };
        if self.store.load().await?.is_some() {
            return Ok(false);
        }
        self.store.save(&video_id).await?;
        info!("Seeded last announced video with {}", video_id);
        Ok(true)
    }

    /// Substitute `%title` and `%url` in one pass; substituted text is never rescanned.
    pub fn render(&self, video: &Video) -> String {
        let url = video.watch_url();
        let mut out = String::with_capacity(self.format.len() + video.title.len() + url.len());
        let mut rest = self.format.as_str();

        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(after) = tail.strip_prefix("%title") {
                out.push_str(&video.title);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("%url") {
                out.push_str(&url);
                rest = after;
            } else {
                out.push('%');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }

    /// One poll: compare the latest upload with the stored id and announce it if new.
    pub async fn check(&self) -> anyhow::Result<AnnounceOutcome> {
        let last_seen = self.store.load().await?;
        let Some(video) = self.source.latest_upload().await? else {
            return Ok(AnnounceOutcome::NoUploads);
        };

        if last_seen.as_deref() == Some(video.id.as_str()) {
            debug!("No new upload (latest is still {})", video.id);
            return Ok(AnnounceOutcome::Unchanged);
        }

        self.store.save(&video.id).await?;
        info!("New upload {}: {}", video.id, video.title);

        if !self.platform.channel_exists(self.channel).await {
            warn!("Announcement channel {} not found, skipping post", self.channel);
            return Ok(AnnounceOutcome::ChannelMissing(video));
        }

        self.platform
            .send_message(self.channel, &self.render(&video))
            .await?;
        Ok(AnnounceOutcome::Announced(video))
    }
}

#[async_trait]
impl Job for UploadAnnouncer {
    fn name(&self) -> &'static str {
        "upload announcement"
    }

    async fn tick(&self) -> anyhow::Result<()> {
        self.check().await?;
        Ok(())
    }
}
