//! Welcome-channel invite rotation.

use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tracing::{error, info, warn};

use crate::common::error::DiscordResult;
use crate::discord::platform::{ChatPlatform, InviteRecord};
use crate::jobs::sync::InviteSync;
use crate::jobs::Job;

/// What one rotation did.
#[derive(Debug, Clone)]
pub struct RotationReport {
    pub removed: usize,
    pub failed_removals: usize,
    pub invite: InviteRecord,
    /// `None` when sync is disabled.
    pub synced: Option<bool>,
}

/// Replaces the welcome-channel invite every interval.
pub struct InviteRotator {
    platform: Arc<dyn ChatPlatform>,
    guild_id: GuildId,
    welcome_channel: ChannelId,
    interval: Duration,
    sync: Option<InviteSync>,
}

impl InviteRotator {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        guild_id: GuildId,
        welcome_channel: ChannelId,
        interval: Duration,
        sync: Option<InviteSync>,
    ) -> Self {
        Self {
            platform,
            guild_id,
            welcome_channel,
            interval,
            sync,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Delete old welcome invites, create a new one, then sync it.
    ///
    /// Only listing or creating invites can fail the rotation; removal and
    /// sync problems are logged.
    pub async fn rotate(&self) -> DiscordResult<RotationReport> {
        let invites = self.platform.guild_invites(self.guild_id).await?;

        let mut removed = 0;
        let mut failed_removals = 0;
        for invite in invites
            .iter()
            .filter(|invite| invite.channel_id == self.welcome_channel)
        {
            match self.platform.delete_invite(&invite.code).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!("Failed to delete invite {}: {}", invite.code, e);
                    failed_removals += 1;
                }
            }
        }

        let invite = self
            .platform
            .create_invite(self.welcome_channel, self.interval, true)
            .await?;
        info!(
            "Rotated welcome invite: removed {}, new {} (expires {})",
            removed, invite.url, invite.expires_at
        );

        let synced = match self.sync {
            Some(ref sync) => Some(match sync.push(&invite.url).await {
                Ok(outcome) => {
                    info!(
                        "Invite {} synced after {} credential refresh(es)",
                        invite.code, outcome.refreshes
                    );
                    true
                }
                Err(e) => {
                    error!("Failed to sync invite {}: {}", invite.code, e);
                    false
                }
            }),
            None => None,
        };

        Ok(RotationReport {
            removed,
            failed_removals,
            invite,
            synced,
        })
    }
}

#[async_trait]
impl Job for InviteRotator {
    fn name(&self) -> &'static str {
        "invite rotation"
    }

    async fn tick(&self) -> anyhow::Result<()> {
        let report = self.rotate().await?;
        if report.failed_removals > 0 {
            warn!(
                "{} old welcome invite(s) could not be removed",
                report.failed_removals
            );
        }
        info!(
            "Welcome invite is now {} (removed {}, sync: {})",
            report.invite.url,
            report.removed,
            match report.synced {
                Some(true) => "ok",
                Some(false) => "failed",
                None => "disabled",
            }
        );
        Ok(())
    }
}
