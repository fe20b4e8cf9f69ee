//! Discord bot commands (#ban).
//!
//! Handles command parsing, moderator authorization and execution.

use serenity::model::id::UserId;
use tracing::{debug, info, warn};

use crate::discord::platform::ChatPlatform;
use crate::moderation::{execute_ban, BanOutcome, BanRequest, IncomingMessage};

/// Commands understood by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `ban <member> [reason...]`; target is `None` when missing or unparseable.
    Ban {
        target: Option<UserId>,
        reason: Option<String>,
    },
}

/// Parse a command after `prefix`. Returns `None` for anything that is not a
/// known command.
pub fn parse_command(prefix: &str, content: &str) -> Option<Command> {
    let body = content.trim().strip_prefix(prefix)?;
    let mut parts = body.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let args = parts.next().unwrap_or("").trim();

    match command.as_str() {
        "ban" => {
            let mut args = args.splitn(2, char::is_whitespace);
            let target = args.next().and_then(parse_target);
            let reason = args
                .next()
                .map(str::trim)
                .filter(|reason| !reason.is_empty())
                .map(str::to_string);
            Some(Command::Ban { target, reason })
        }
        _ => None,
    }
}

/// Accepts `<@id>`, `<@!id>` or a raw user id.
fn parse_target(token: &str) -> Option<UserId> {
    serenity::utils::parse_user_mention(token).or_else(|| {
        token
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .map(UserId::new)
    })
}

/// Command handler for Discord bot.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    prefix: String,
    moderator_role: String,
    rules_channel: String,
}

impl CommandHandler {
    pub fn new(prefix: String, moderator_role: String, rules_channel: String) -> Self {
        Self {
            prefix,
            moderator_role,
            rules_channel,
        }
    }

    /// Parse and execute a command from Discord.
    ///
    /// Returns `true` if the message was a command, `false` otherwise.
    pub async fn handle_command(
        &self,
        platform: &dyn ChatPlatform,
        msg: &IncomingMessage,
    ) -> anyhow::Result<bool> {
        let Some(command) = parse_command(&self.prefix, &msg.content) else {
            return Ok(false);
        };
        debug!("Processing command {:?} from {}", command, msg.author.tag);

        if !self.is_moderator(platform, msg) {
            warn!(
                "{} is missing the {} role, ignoring {:?}",
                msg.author.tag, self.moderator_role, command
            );
            return Ok(true);
        }

        match command {
            Command::Ban { target, reason } => {
                self.handle_ban(platform, msg, target, reason).await?;
            }
        }
        Ok(true)
    }

    fn is_moderator(&self, platform: &dyn ChatPlatform, msg: &IncomingMessage) -> bool {
        platform
            .find_role(msg.guild_id, &self.moderator_role)
            .is_some_and(|role| msg.author.roles.contains(&role))
    }

    /// Handle #ban command.
    async fn handle_ban(
        &self,
        platform: &dyn ChatPlatform,
        msg: &IncomingMessage,
        target: Option<UserId>,
        reason: Option<String>,
    ) -> anyhow::Result<()> {
        let Some(target) = target else {
            let usage = format!("Usage: `{}ban @member [reason]`", self.prefix);
            platform.send_message(msg.channel_id, &usage).await?;
            return Ok(());
        };

        info!("{}ban command from {} targeting {}", self.prefix, msg.author.tag, target);

        let request = BanRequest {
            guild_id: msg.guild_id,
            channel_id: msg.channel_id,
            moderator_name: msg.author.name.clone(),
            target,
            reason,
        };

        match execute_ban(platform, &self.rules_channel, &request).await {
            Ok(BanOutcome::RefusedAdministrator) | Ok(BanOutcome::Banned { .. }) => Ok(()),
            Err(e) => {
                let notice = format!("Could not ban <@{}>: {}", target, e);
                if let Err(post_error) = platform.send_message(msg.channel_id, &notice).await {
                    warn!("Failed to report ban failure: {}", post_error);
                }
                Err(e.into())
            }
        }
    }
}
