//! Ban command execution.

use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::model::mention::Mentionable;
use tracing::{info, warn};

use crate::common::error::DiscordResult;
use crate::discord::platform::ChatPlatform;

/// Reason used when the moderator gives none.
pub const DEFAULT_REASON: &str = "Not specified";

/// A validated ban request from an authorized moderator.
#[derive(Debug, Clone)]
pub struct BanRequest {
    pub guild_id: GuildId,
    /// Channel the command was issued in.
    pub channel_id: ChannelId,
    pub moderator_name: String,
    pub target: UserId,
    pub reason: Option<String>,
}

impl BanRequest {
    pub fn reason(&self) -> &str {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .unwrap_or(DEFAULT_REASON)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanOutcome {
    /// Target is an administrator; nothing was done beyond the warning.
    RefusedAdministrator,
    Banned { dm_delivered: bool },
}

/// Run the ban sequence: DM the target, confirm in channel, ban.
///
/// The DM and the confirmation are best-effort. Only failures to look up the
/// target or to ban are returned.
pub async fn execute_ban(
    platform: &dyn ChatPlatform,
    rules_channel: &str,
    request: &BanRequest,
) -> DiscordResult<BanOutcome> {
    let member = platform.member(request.guild_id, request.target).await?;

    if member.administrator {
        info!(
            "{} tried to ban administrator {}, refusing",
            request.moderator_name, member.name
        );
        let warning = format!(
            "Hi {}! The member you are trying to ban is a server Administrator. Please don't try this on them else they can get angry! :person_shrugging:",
            request.moderator_name
        );
        if let Err(e) = platform.send_message(request.channel_id, &warning).await {
            warn!("Failed to post administrator warning: {}", e);
        }
        return Ok(BanOutcome::RefusedAdministrator);
    }

    let reason = request.reason();
    let guild_name = platform
        .guild_name(request.guild_id)
        .unwrap_or_else(|| "the server".to_string());

    let notice = format!(
        "Hi {}! You have been banned from {}. You must have done something wrong. VERY BAD! :angry: :triumph: \n \nReason: {}",
        member.name, guild_name, reason
    );
    let dm_delivered = match platform.send_direct_message(member.user_id, &notice).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not DM {} about their ban: {}", member.name, e);
            false
        }
    };

    let rules = platform
        .find_channel(request.guild_id, rules_channel)
        .map(|channel| channel.mention().to_string())
        .unwrap_or_else(|| format!("#{}", rules_channel));
    let confirmation = format!(
        "{} flew too close to the sun and got banned. Maybe they should have followed the {} \n \nReason: {}",
        member.name, rules, reason
    );
    if let Err(e) = platform.send_message(request.channel_id, &confirmation).await {
        warn!("Failed to post ban confirmation: {}", e);
    }

    platform
        .ban(request.guild_id, member.user_id, reason)
        .await?;
    info!(
        "{} banned {} ({}), reason: {}",
        request.moderator_name, member.name, member.user_id, reason
    );

    Ok(BanOutcome::Banned { dm_delivered })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::DiscordError;
    use crate::discord::fake::{Action, FakePlatform};

    const TARGET: u64 = 600;

    fn request(reason: Option<&str>) -> BanRequest {
        BanRequest {
            guild_id: GuildId::new(1),
            channel_id: ChannelId::new(10),
            moderator_name: "mod".to_string(),
            target: UserId::new(TARGET),
            reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn test_reason_defaults() {
        assert_eq!(request(None).reason(), "Not specified");
        assert_eq!(request(Some("   ")).reason(), "Not specified");
        assert_eq!(request(Some(" spam ")).reason(), "spam");
    }

    #[tokio::test]
    async fn test_administrator_is_not_banned() {
        let platform = FakePlatform::new().with_member(TARGET, "boss", true);

        let outcome = execute_ban(&platform, "rules", &request(Some("x"))).await.unwrap();

        assert_eq!(outcome, BanOutcome::RefusedAdministrator);
        let actions = platform.actions();
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Action::Send { content, .. } => {
                assert!(content.starts_with("Hi mod!"));
                assert!(content.contains("server Administrator"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ban_sequence_in_order() {
        let mut platform = FakePlatform::new().with_member(TARGET, "spammer", false);
        platform.guild_name = Some("Pod Squad".to_string());
        platform.channels.insert("rules".to_string(), ChannelId::new(33));

        let outcome = execute_ban(&platform, "rules", &request(None)).await.unwrap();

        assert_eq!(outcome, BanOutcome::Banned { dm_delivered: true });
        let actions = platform.actions();
        assert_eq!(actions.len(), 3);
        match &actions[0] {
            Action::DirectMessage { user, content } => {
                assert_eq!(*user, UserId::new(TARGET));
                assert!(content.contains("banned from Pod Squad"));
                assert!(content.ends_with("Reason: Not specified"));
            }
            other => panic!("expected DM first, got {:?}", other),
        }
        match &actions[1] {
            Action::Send { channel, content } => {
                assert_eq!(*channel, ChannelId::new(10));
                assert!(content.starts_with("spammer flew too close to the sun"));
                assert!(content.contains("<#33>"));
            }
            other => panic!("expected confirmation second, got {:?}", other),
        }
        assert_eq!(
            actions[2],
            Action::Ban {
                guild: GuildId::new(1),
                user: UserId::new(TARGET),
                reason: "Not specified".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_blocked_dm_does_not_stop_ban() {
        let mut platform = FakePlatform::new().with_member(TARGET, "spammer", false);
        platform.dm_blocked.insert(UserId::new(TARGET));

        let outcome = execute_ban(&platform, "rules", &request(Some("spam"))).await.unwrap();

        assert_eq!(outcome, BanOutcome::Banned { dm_delivered: false });
        let bans: Vec<_> = platform
            .actions()
            .into_iter()
            .filter(|a| matches!(a, Action::Ban { .. }))
            .collect();
        assert_eq!(bans.len(), 1);
        assert!(platform.posts()[0].contains("#rules"));
    }

    #[tokio::test]
    async fn test_ban_failure_is_returned() {
        let mut platform = FakePlatform::new().with_member(TARGET, "spammer", false);
        platform.fail_ban = true;

        let result = execute_ban(&platform, "rules", &request(None)).await;

        assert!(matches!(result, Err(DiscordError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn test_unknown_target_does_nothing() {
        let platform = FakePlatform::new();

        let result = execute_ban(&platform, "rules", &request(None)).await;

        assert!(matches!(result, Err(DiscordError::MemberNotFound { .. })));
        assert!(platform.actions().is_empty());
    }
}
