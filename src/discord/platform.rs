//! Chat platform abstraction.
//!
//! Moderation and the periodic jobs talk to Discord through [`ChatPlatform`]
//! so they can run against a recording fake in tests. [`SerenityPlatform`]
//! is the real implementation over serenity's HTTP client and cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serenity::async_trait;
use serenity::builder::{CreateInvite, CreateMessage};
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};

use crate::common::error::{DiscordError, DiscordResult};

/// An existing guild invite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteInfo {
    pub code: String,
    pub channel_id: ChannelId,
}

/// A freshly created invite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteRecord {
    pub code: String,
    pub url: String,
    pub max_age: Duration,
    pub expires_at: DateTime<Utc>,
}

/// What moderation needs to know about a guild member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub user_id: UserId,
    pub name: String,
    pub administrator: bool,
}

/// Discord operations used by the bot.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn send_message(&self, channel: ChannelId, content: &str) -> DiscordResult<()>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> DiscordResult<()>;

    async fn send_direct_message(&self, user: UserId, content: &str) -> DiscordResult<()>;

    /// Role lookup by name, case-insensitive.
    fn find_role(&self, guild: GuildId, name: &str) -> Option<RoleId>;

    /// Channel lookup by name, case-insensitive.
    fn find_channel(&self, guild: GuildId, name: &str) -> Option<ChannelId>;

    fn guild_name(&self, guild: GuildId) -> Option<String>;

    async fn channel_exists(&self, channel: ChannelId) -> bool;

    async fn member(&self, guild: GuildId, user: UserId) -> DiscordResult<MemberInfo>;

    async fn ban(&self, guild: GuildId, user: UserId, reason: &str) -> DiscordResult<()>;

    async fn guild_invites(&self, guild: GuildId) -> DiscordResult<Vec<InviteInfo>>;

    async fn delete_invite(&self, code: &str) -> DiscordResult<()>;

    async fn create_invite(
        &self,
        channel: ChannelId,
        max_age: Duration,
        unique: bool,
    ) -> DiscordResult<InviteRecord>;
}

/// [`ChatPlatform`] backed by serenity.
#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl SerenityPlatform {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }

    /// Administrator through ownership, @everyone, or any held role.
    fn is_administrator(&self, guild: GuildId, member: &Member) -> DiscordResult<bool> {
        let guild_ref = self
            .cache
            .guild(guild)
            .ok_or(DiscordError::GuildNotFound { guild_id: guild.get() })?;

        if guild_ref.owner_id == member.user.id {
            return Ok(true);
        }

        let everyone = RoleId::new(guild.get());
        let administrator = std::iter::once(&everyone)
            .chain(member.roles.iter())
            .filter_map(|role_id| guild_ref.roles.get(role_id))
            .any(|role| role.permissions.administrator());
        Ok(administrator)
    }
}

#[async_trait]
impl ChatPlatform for SerenityPlatform {
    async fn send_message(&self, channel: ChannelId, content: &str) -> DiscordResult<()> {
        channel.say(&self.http, content).await?;
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> DiscordResult<()> {
        channel.delete_message(&self.http, message).await?;
        Ok(())
    }

    async fn send_direct_message(&self, user: UserId, content: &str) -> DiscordResult<()> {
        user.direct_message(&self.http, CreateMessage::new().content(content))
            .await?;
        Ok(())
    }

    fn find_role(&self, guild: GuildId, name: &str) -> Option<RoleId> {
        self.cache
            .guild(guild)?
            .roles
            .values()
            .find(|role| role.name.eq_ignore_ascii_case(name))
            .map(|role| role.id)
    }

    fn find_channel(&self, guild: GuildId, name: &str) -> Option<ChannelId> {
        self.cache
            .guild(guild)?
            .channels
            .values()
            .find(|channel| channel.name.eq_ignore_ascii_case(name))
            .map(|channel| channel.id)
    }

    fn guild_name(&self, guild: GuildId) -> Option<String> {
        self.cache.guild(guild).map(|g| g.name.clone())
    }

    async fn channel_exists(&self, channel: ChannelId) -> bool {
        let cached = self.cache.guilds().into_iter().any(|guild| {
            self.cache
                .guild(guild)
                .is_some_and(|g| g.channels.contains_key(&channel))
        });
        cached || channel.to_channel(&self.http).await.is_ok()
    }

    async fn member(&self, guild: GuildId, user: UserId) -> DiscordResult<MemberInfo> {
        let cached: Option<Member> = self
            .cache
            .guild(guild)
            .and_then(|g| g.members.get(&user).cloned());
        let member = match cached {
            Some(member) => member,
            None => guild.member(&self.http, user).await.map_err(|e| {
                tracing::debug!("Member lookup for {} failed: {}", user, e);
                DiscordError::MemberNotFound {
                    guild_id: guild.get(),
                    user_id: user.get(),
                }
            })?,
        };

        Ok(MemberInfo {
            user_id: member.user.id,
            name: member.user.name.clone(),
            administrator: self.is_administrator(guild, &member)?,
        })
    }

    async fn ban(&self, guild: GuildId, user: UserId, reason: &str) -> DiscordResult<()> {
        guild.ban_with_reason(&self.http, user, 0, reason).await?;
        Ok(())
    }

    async fn guild_invites(&self, guild: GuildId) -> DiscordResult<Vec<InviteInfo>> {
        let invites = guild.invites(&self.http).await?;
        Ok(invites
            .into_iter()
            .map(|invite| InviteInfo {
                code: invite.code,
                channel_id: invite.channel.id,
            })
            .collect())
    }

    async fn delete_invite(&self, code: &str) -> DiscordResult<()> {
        self.http.delete_invite(code, None).await?;
        Ok(())
    }

    async fn create_invite(
        &self,
        channel: ChannelId,
        max_age: Duration,
        unique: bool,
    ) -> DiscordResult<InviteRecord> {
        let seconds = u32::try_from(max_age.as_secs()).unwrap_or(u32::MAX);
        let builder = CreateInvite::new().max_age(seconds).unique(unique);
        let invite = channel.create_invite(&self.http, builder).await?;

        Ok(InviteRecord {
            url: invite.url(),
            code: invite.code,
            max_age,
            expires_at: Utc::now() + chrono::Duration::seconds(i64::from(seconds)),
        })
    }
}
