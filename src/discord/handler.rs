//! Discord message event handling.
//!
//! Every guild message goes through the word filter first; messages that
//! survive it are checked for commands.

use serenity::model::channel::Message;
use serenity::model::id::{GuildId, UserId};
use serenity::model::mention::Mentionable;
use serenity::prelude::*;
use tracing::{debug, error};

use crate::config::types::Config;
use crate::discord::commands::CommandHandler;
use crate::discord::platform::{ChatPlatform, SerenityPlatform};
use crate::moderation::{Author, IncomingMessage, WordFilter};

/// What happened to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Own message, other guild, or empty.
    Ignored,
    /// Removed by the word filter.
    Filtered,
    /// Handled as a command.
    Command,
    /// Nothing to do.
    Passed,
}

/// Discord message handler.
pub struct ModerationHandler {
    guild_id: GuildId,
    filter: WordFilter,
    commands: CommandHandler,
}

impl ModerationHandler {
    pub fn new(config: &Config) -> Self {
        Self {
            guild_id: GuildId::new(config.discord.guild_id),
            filter: WordFilter::new(
                &config.moderation.banned_words_file,
                config.discord.moderator_role.clone(),
            ),
            commands: CommandHandler::new(
                config.discord.command_prefix.clone(),
                config.discord.moderator_role.clone(),
                config.discord.rules_channel.clone(),
            ),
        }
    }

    pub async fn handle_message(&self, ctx: &Context, msg: Message) {
        // Only handle guild (server) messages
        let Some(guild_id) = msg.guild_id else {
            return;
        };

        let bot_id = ctx.cache.current_user().id;
        let incoming = to_incoming(&msg, guild_id);
        let platform = SerenityPlatform::new(ctx.http.clone(), ctx.cache.clone());
        self.handle_incoming(&platform, &incoming, bot_id).await;
    }

    pub async fn handle_incoming(
        &self,
        platform: &dyn ChatPlatform,
        msg: &IncomingMessage,
        bot_id: UserId,
    ) -> Disposition {
        // Ignore our own messages
        if msg.author.id == bot_id {
            return Disposition::Ignored;
        }
        if msg.guild_id != self.guild_id {
            debug!("Ignoring message from unconfigured guild {}", msg.guild_id);
            return Disposition::Ignored;
        }
        if msg.content.trim().is_empty() {
            return Disposition::Ignored;
        }

        if self.filter.apply(platform, msg).await.is_some() {
            return Disposition::Filtered;
        }

        match self.commands.handle_command(platform, msg).await {
            Ok(true) => Disposition::Command,
            Ok(false) => Disposition::Passed,
            Err(e) => {
                error!("Command handler error: {:#}", e);
                Disposition::Command
            }
        }
    }
}

fn to_incoming(msg: &Message, guild_id: GuildId) -> IncomingMessage {
    IncomingMessage {
        id: msg.id,
        channel_id: msg.channel_id,
        guild_id,
        author: Author {
            id: msg.author.id,
            name: msg.author.name.clone(),
            tag: msg.author.tag(),
            mention: msg.author.mention().to_string(),
            roles: msg
                .member
                .as_ref()
                .map(|member| member.roles.clone())
                .unwrap_or_default(),
        },
        content: msg.content.clone(),
    }
}
