//! Discord bot integration.
//!
//! The gateway client, message handling and the moderator command set,
//! with all guild operations going through [`platform::ChatPlatform`].

pub mod client;
pub mod commands;
#[cfg(test)]
pub mod fake;
pub mod handler;
pub mod platform;

// Re-export main types for external use
pub use client::DiscordBotBuilder;
