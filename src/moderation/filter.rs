//! Banned-word filtering.
//!
//! The word list is re-read from disk for every message so edits to the file
//! take effect without a restart.

use std::path::{Path, PathBuf};

use serenity::model::mention::Mentionable;
use tracing::{debug, error, info, warn};

use crate::discord::platform::ChatPlatform;
use crate::moderation::IncomingMessage;

/// Ordered list of lowercase banned terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannedWordList {
    words: Vec<String>,
}

impl BannedWordList {
    /// Parse a newline-delimited list. Blank lines and `#` comments are skipped.
    pub fn parse(content: &str) -> Self {
        let words = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_lowercase)
            .collect();
        Self { words }
    }

    pub async fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self::parse(&content))
    }

    /// First listed term contained in the lowercased message.
    pub fn first_match(&self, content: &str) -> Option<&str> {
        let content = content.to_lowercase();
        self.words
            .iter()
            .find(|word| content.contains(word.as_str()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }
}

/// Deletes messages containing banned words and posts warnings.
#[derive(Debug, Clone)]
pub struct WordFilter {
    words_file: PathBuf,
    moderator_role: String,
}

impl WordFilter {
    pub fn new(words_file: impl Into<PathBuf>, moderator_role: impl Into<String>) -> Self {
        Self {
            words_file: words_file.into(),
            moderator_role: moderator_role.into(),
        }
    }

    /// Check a message and act on the first banned word found.
    ///
    /// Returns the matched word. Delete and post failures are logged and the
    /// warning sequence continues.
    pub async fn apply(&self, platform: &dyn ChatPlatform, msg: &IncomingMessage) -> Option<String> {
        let words = match BannedWordList::load(&self.words_file).await {
            Ok(words) => words,
            Err(e) => {
                error!(
                    "Failed to read banned words from {}: {}",
                    self.words_file.display(),
                    e
                );
                return None;
            }
        };

        debug!("Checking message {} against {} banned words", msg.id, words.len());
        let word = words.first_match(&msg.content)?.to_string();
        info!(
            "FILTERED message {} from {} in channel {}",
            msg.id, msg.author.tag, msg.channel_id
        );

        if let Err(e) = platform.delete_message(msg.channel_id, msg.id).await {
            warn!("Failed to delete message {}: {}", msg.id, e);
        }

        let role_mention = platform
            .find_role(msg.guild_id, &self.moderator_role)
            .map(|role| role.mention().to_string());
        let tag = &msg.author.tag;
        let report = match role_mention {
            Some(role) => format!("{} {} has cursed. !warn {} Cursed", role, tag, tag),
            None => format!("{} has cursed. !warn {} Cursed", tag, tag),
        };

        let posts = [
            format!("{} Don't use that word.", msg.author.mention),
            report,
            format!("!mute {} Cursed", msg.author.mention),
        ];
        for post in &posts {
            if let Err(e) = platform.send_message(msg.channel_id, post).await {
                warn!("Failed to post filter warning in {}: {}", msg.channel_id, e);
            }
        }

        Some(word)
    }
}
