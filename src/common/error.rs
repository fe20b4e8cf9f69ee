//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {message}")]
    IoError { path: String, message: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Discord-related errors.
#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("Guild not found: {guild_id}")]
    GuildNotFound { guild_id: u64 },

    #[error("Member {user_id} not found in guild {guild_id}")]
    MemberNotFound { guild_id: u64, user_id: u64 },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Serenity error: {0}")]
    Serenity(#[source] serenity::Error),
}

impl From<serenity::Error> for DiscordError {
    /// HTTP 403 responses (missing permissions, closed DMs) become `PermissionDenied`.
    fn from(error: serenity::Error) -> Self {
        if let serenity::Error::Http(ref http_error) = error {
            if http_error.status_code().map(|status| status.as_u16()) == Some(403) {
                return DiscordError::PermissionDenied {
                    message: http_error.to_string(),
                };
            }
        }
        DiscordError::Serenity(error)
    }
}

/// Errors from the invite sync service.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Credential endpoint returned status {status}")]
    CredentialStatus { status: u16 },

    #[error("Credential response did not contain a key")]
    MissingCredential,

    #[error("Invite update rejected with status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Credential still rejected after {refreshes} refresh(es)")]
    CredentialRejected { refreshes: u32 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors from the video platform query.
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Video search returned status {status}")]
    Status { status: u16 },

    #[error("Malformed video search response: {message}")]
    Malformed { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors from the last-seen video store.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to access state file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Discord operations.
pub type DiscordResult<T> = std::result::Result<T, DiscordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_http_serenity_error_kept() {
        let error = DiscordError::from(serenity::Error::Other("gateway closed"));
        assert!(matches!(error, DiscordError::Serenity(_)));
    }
}
