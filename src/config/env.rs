//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `WARDEN_DISCORD_TOKEN` - Discord bot token
//! - `WARDEN_GUILD_ID` - Guild the bot moderates
//! - `WARDEN_YOUTUBE_API_KEY` - YouTube Data API key
//! - `WARDEN_SITE_UP` - Enables invite sync (`true`/`false`)
//! - `WARDEN_API_KEY_URL` - Credential endpoint for invite sync
//! - `WARDEN_INVITE_UPDATE_URL` - Invite update endpoint

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "WARDEN";

/// Apply environment variable overrides to a config.
///
/// This allows secrets and per-deploy toggles to be provided via
/// environment variables instead of the config file.
pub fn apply_env_overrides(config: Config) -> Config {
    apply_overrides_from(config, |name| env::var(format!("{}_{}", ENV_PREFIX, name)).ok())
}

fn apply_overrides_from(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(token) = lookup("DISCORD_TOKEN") {
        config.discord.token = token;
    }
    if let Some(guild_id) = lookup("GUILD_ID") {
        if let Ok(id) = guild_id.parse() {
            config.discord.guild_id = id;
        }
    }

    // Invite sync
    if let Some(site_up) = lookup("SITE_UP") {
        config.invites.sync.enabled = site_up.eq_ignore_ascii_case("true");
    }
    if let Some(url) = lookup("API_KEY_URL") {
        config.invites.sync.key_url = url;
    }
    if let Some(url) = lookup("INVITE_UPDATE_URL") {
        config.invites.sync.update_url = url;
    }

    // YouTube key only applies when the section exists
    if let Some(api_key) = lookup("YOUTUBE_API_KEY") {
        if let Some(ref mut youtube) = config.youtube {
            youtube.api_key = api_key;
        }
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `WARDEN_CONFIG` environment variable, otherwise returns "warden.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "warden.conf".to_string())
}
