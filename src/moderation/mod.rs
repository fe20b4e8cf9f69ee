//! Message moderation: banned-word filter and the ban command.

pub mod ban;
pub mod filter;

use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};

pub use ban::{execute_ban, BanOutcome, BanRequest};
pub use filter::WordFilter;

/// A guild message, reduced to what moderation looks at.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
    pub author: Author,
    pub content: String,
}

/// Message author details.
#[derive(Debug, Clone)]
pub struct Author {
    pub id: UserId,
    /// Account name.
    pub name: String,
    /// `name` or `name#discriminator`.
    pub tag: String,
    /// `<@id>` form.
    pub mention: String,
    pub roles: Vec<RoleId>,
}

#[cfg(test)]
pub(crate) fn test_message(content: &str) -> IncomingMessage {
    IncomingMessage {
        id: MessageId::new(900),
        channel_id: ChannelId::new(10),
        guild_id: GuildId::new(1),
        author: Author {
            id: UserId::new(500),
            name: "trouble".to_string(),
            tag: "trouble".to_string(),
            mention: "<@500>".to_string(),
            roles: Vec::new(),
        },
        content: content.to_string(),
    }
}
