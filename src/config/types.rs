//! Configuration type definitions.

use std::time::Duration;

use serde::Deserialize;

/// Default announcement text; `%title` and `%url` are substituted.
pub const DEFAULT_ANNOUNCEMENT_FORMAT: &str =
    "!feeds announce announcements A new video uploaded: **%title**\nWatch here: %url";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    pub invites: InvitesConfig,
    pub youtube: Option<YoutubeConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    pub guild_id: u64,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Role allowed to run moderator commands; also tagged by the word filter.
    #[serde(default = "default_moderator_role")]
    pub moderator_role: String,
    /// Channel named in ban confirmations.
    #[serde(default = "default_rules_channel")]
    pub rules_channel: String,
}

/// Word filter settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    #[serde(default = "default_banned_words_file")]
    pub banned_words_file: String,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            banned_words_file: default_banned_words_file(),
        }
    }
}

/// Invite rotation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct InvitesConfig {
    pub welcome_channel: u64,
    #[serde(default = "default_rotation_hours")]
    pub rotation_hours: u64,
    #[serde(default)]
    pub sync: InviteSyncConfig,
}

impl InvitesConfig {
    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(self.rotation_hours * 60 * 60)
    }
}

/// External invite sync service.
#[derive(Debug, Clone, Deserialize)]
pub struct InviteSyncConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub key_url: String,
    #[serde(default)]
    pub update_url: String,
    /// How many times a 403 may trigger a credential refresh and retry.
    #[serde(default = "default_max_credential_refreshes")]
    pub max_credential_refreshes: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for InviteSyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            key_url: String::new(),
            update_url: String::new(),
            max_credential_refreshes: default_max_credential_refreshes(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Upload announcement settings.
#[derive(Debug, Clone, Deserialize)]
pub struct YoutubeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub api_key: String,
    pub channel_id: String,
    pub announcement_channel: u64,
    #[serde(default = "default_poll_minutes")]
    pub poll_minutes: u64,
    #[serde(default = "default_state_file")]
    pub state_file: String,
    /// Video (URL or id) treated as already announced on first start.
    pub seed_video: Option<String>,
    pub announcement_format: Option<String>,
    pub api_base: Option<String>,
}

impl YoutubeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_minutes * 60)
    }

    pub fn announcement_format(&self) -> &str {
        self.announcement_format
            .as_deref()
            .unwrap_or(DEFAULT_ANNOUNCEMENT_FORMAT)
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Additional plain-text log file.
    pub file: Option<String>,
}

fn default_command_prefix() -> String {
    "#".to_string()
}

fn default_moderator_role() -> String {
    "Podcasters".to_string()
}

fn default_rules_channel() -> String {
    "rules".to_string()
}

fn default_banned_words_file() -> String {
    "curse_words.txt".to_string()
}

fn default_rotation_hours() -> u64 {
    72
}

fn default_max_credential_refreshes() -> u32 {
    1
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

fn default_poll_minutes() -> u64 {
    45
}

fn default_state_file() -> String {
    "last_video_id.txt".to_string()
}
