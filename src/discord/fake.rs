//! Recording [`ChatPlatform`] for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};

use crate::common::error::{DiscordError, DiscordResult};
use crate::discord::platform::{ChatPlatform, InviteInfo, InviteRecord, MemberInfo};

/// Side effects observed by the fake, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Send { channel: ChannelId, content: String },
    Delete { channel: ChannelId, message: MessageId },
    DirectMessage { user: UserId, content: String },
    Ban { guild: GuildId, user: UserId, reason: String },
    DeleteInvite { code: String },
    CreateInvite { channel: ChannelId, max_age: Duration, unique: bool },
}

#[derive(Default)]
pub struct FakePlatform {
    pub guild_name: Option<String>,
    pub roles: HashMap<String, RoleId>,
    pub channels: HashMap<String, ChannelId>,
    pub known_channels: HashSet<ChannelId>,
    pub members: HashMap<UserId, MemberInfo>,
    pub invites: Vec<InviteInfo>,
    pub dm_blocked: HashSet<UserId>,
    pub undeletable_invites: HashSet<String>,
    pub fail_ban: bool,
    pub fail_delete_message: bool,
    actions: Mutex<Vec<Action>>,
}

fn denied(message: &str) -> DiscordError {
    DiscordError::PermissionDenied {
        message: message.to_string(),
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(mut self, id: u64, name: &str, administrator: bool) -> Self {
        let user_id = UserId::new(id);
        self.members.insert(
            user_id,
            MemberInfo {
                user_id,
                name: name.to_string(),
                administrator,
            },
        );
        self
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    /// Contents of every channel post, in order.
    pub fn posts(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Send { content, .. } => Some(content),
                _ => None,
            })
            .collect()
    }

    fn record(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn send_message(&self, channel: ChannelId, content: &str) -> DiscordResult<()> {
        self.record(Action::Send {
            channel,
            content: content.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> DiscordResult<()> {
        if self.fail_delete_message {
            return Err(denied("manage messages"));
        }
        self.record(Action::Delete { channel, message });
        Ok(())
    }

    async fn send_direct_message(&self, user: UserId, content: &str) -> DiscordResult<()> {
        self.record(Action::DirectMessage {
            user,
            content: content.to_string(),
        });
        if self.dm_blocked.contains(&user) {
            return Err(denied("direct messages disabled"));
        }
        Ok(())
    }

    fn find_role(&self, _guild: GuildId, name: &str) -> Option<RoleId> {
        self.roles
            .iter()
            .find(|(role, _)| role.eq_ignore_ascii_case(name))
            .map(|(_, id)| *id)
    }

    fn find_channel(&self, _guild: GuildId, name: &str) -> Option<ChannelId> {
        self.channels
            .iter()
            .find(|(channel, _)| channel.eq_ignore_ascii_case(name))
            .map(|(_, id)| *id)
    }

    fn guild_name(&self, _guild: GuildId) -> Option<String> {
        self.guild_name.clone()
    }

    async fn channel_exists(&self, channel: ChannelId) -> bool {
        self.known_channels.contains(&channel)
    }

    async fn member(&self, guild: GuildId, user: UserId) -> DiscordResult<MemberInfo> {
        self.members
            .get(&user)
            .cloned()
            .ok_or(DiscordError::MemberNotFound {
                guild_id: guild.get(),
                user_id: user.get(),
            })
    }

    async fn ban(&self, guild: GuildId, user: UserId, reason: &str) -> DiscordResult<()> {
        self.record(Action::Ban {
            guild,
            user,
            reason: reason.to_string(),
        });
        if self.fail_ban {
            return Err(denied("ban members"));
        }
        Ok(())
    }

    async fn guild_invites(&self, _guild: GuildId) -> DiscordResult<Vec<InviteInfo>> {
        Ok(self.invites.clone())
    }

    async fn delete_invite(&self, code: &str) -> DiscordResult<()> {
        if self.undeletable_invites.contains(code) {
            return Err(denied("manage guild"));
        }
        self.record(Action::DeleteInvite {
            code: code.to_string(),
        });
        Ok(())
    }

    async fn create_invite(
        &self,
        channel: ChannelId,
        max_age: Duration,
        unique: bool,
    ) -> DiscordResult<InviteRecord> {
        self.record(Action::CreateInvite {
            channel,
            max_age,
            unique,
        });
        Ok(InviteRecord {
            code: "fresh".to_string(),
            url: "https://discord.gg/fresh".to_string(),
            max_age,
            expires_at: Utc::now() + chrono::Duration::seconds(max_age.as_secs() as i64),
        })
    }
}
