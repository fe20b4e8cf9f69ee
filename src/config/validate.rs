//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.
//! All problems are collected so a bad deploy fails once with the full list.

use std::path::Path;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Sample values shipped in `warden.conf` and older example configs.
const PLACEHOLDER_SECRETS: [&str; 3] = [
    "YOUR_DISCORD_BOT_TOKEN",
    "YOUR_DISCORD_TOKEN_HERE",
    "YOUR_YOUTUBE_API_KEY",
];

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDER_SECRETS.contains(&value.trim())
}

/// Longest invite max-age Discord accepts, in hours.
const MAX_INVITE_HOURS: u64 = 7 * 24;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Discord
    if config.discord.token.is_empty() {
        errors.push("discord.token is required".to_string());
    }
    if is_placeholder(&config.discord.token) {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }
    if config.discord.guild_id == 0 {
        errors.push("discord.guild_id must be non-zero".to_string());
    }
    if config.discord.command_prefix.is_empty() {
        errors.push("discord.command_prefix must not be empty".to_string());
    }
    if config.discord.moderator_role.is_empty() {
        errors.push("discord.moderator_role is required".to_string());
    }

    // Word filter
    let words_file = &config.moderation.banned_words_file;
    if !Path::new(words_file).is_file() {
        errors.push(format!(
            "moderation.banned_words_file '{}' does not exist",
            words_file
        ));
    }

    // Invites
    if config.invites.welcome_channel == 0 {
        errors.push("invites.welcome_channel must be non-zero".to_string());
    }
    if config.invites.rotation_hours == 0 || config.invites.rotation_hours > MAX_INVITE_HOURS {
        errors.push(format!(
            "invites.rotation_hours must be between 1 and {} (got {})",
            MAX_INVITE_HOURS, config.invites.rotation_hours
        ));
    }

    let sync = &config.invites.sync;
    if sync.enabled {
        for (field, value) in [("key_url", &sync.key_url), ("update_url", &sync.update_url)] {
            if value.is_empty() {
                errors.push(format!("invites.sync.{} is required when sync is enabled", field));
            } else if reqwest::Url::parse(value).is_err() {
                errors.push(format!("invites.sync.{} is not a valid URL: '{}'", field, value));
            }
        }
        if sync.timeout_secs == 0 {
            errors.push("invites.sync.timeout_secs must be non-zero".to_string());
        }
    }

    // YouTube
    if let Some(ref youtube) = config.youtube {
        if youtube.enabled {
            if youtube.api_key.is_empty() {
                errors.push("youtube.api_key is required".to_string());
            } else if is_placeholder(&youtube.api_key) {
                errors.push("youtube.api_key has not been configured (still using placeholder)".to_string());
            }
            if youtube.channel_id.is_empty() {
                errors.push("youtube.channel_id is required".to_string());
            }
            if youtube.announcement_channel == 0 {
                errors.push("youtube.announcement_channel must be non-zero".to_string());
            }
            if youtube.poll_minutes == 0 {
                errors.push("youtube.poll_minutes must be non-zero".to_string());
            }
            if youtube.state_file.is_empty() {
                errors.push("youtube.state_file is required".to_string());
            }
            if let Some(ref base) = youtube.api_base {
                if reqwest::Url::parse(base).is_err() {
                    errors.push(format!("youtube.api_base is not a valid URL: '{}'", base));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
