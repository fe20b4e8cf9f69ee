//! Warden - Discord moderation and notification bot
//!
//! Filters banned words, lets moderators ban members, keeps the welcome
//! invite fresh (and mirrored to the community site) and announces new
//! YouTube uploads.

mod common;
mod config;
mod discord;
mod jobs;
mod moderation;

use std::fs::OpenOptions;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use config::{env::get_config_path, load_and_validate};
use discord::DiscordBotBuilder;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = get_config_path();
    let config = load_and_validate(&config_path);

    // Initialize logging
    let log_file = config
        .as_ref()
        .ok()
        .and_then(|c| c.logging.as_ref())
        .and_then(|l| l.file.clone());
    let _log_guard = init_logging(log_file.as_deref())?;

    info!("Warden v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Loading configuration from {}...", config_path);

    let config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Guild: {}", config.discord.guild_id);
    info!("  Command prefix: {}", config.discord.command_prefix);
    info!("  Moderator role: {}", config.discord.moderator_role);
    info!("  Welcome channel: {}", config.invites.welcome_channel);
    info!(
        "  Invite sync: {}",
        if config.invites.sync.enabled { "enabled" } else { "disabled" }
    );
    info!(
        "  Upload announcements: {}",
        match config.youtube {
            Some(ref youtube) if youtube.enabled => "enabled",
            _ => "disabled",
        }
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let discord_bot = DiscordBotBuilder::new(config, shutdown_rx).build().await?;

    info!("Starting Discord bot...");
    let mut discord_task = tokio::spawn(async move {
        discord_bot.run().await;
    });

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping...");
            true
        }
        _ = &mut discord_task => false,
    };

    if shutdown {
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Shutdown channel closed (bot already exited): {}", e);
        }
        match tokio::time::timeout(Duration::from_secs(5), discord_task).await {
            Ok(Ok(())) => info!("Discord bot stopped gracefully"),
            Ok(Err(e)) => warn!("Discord task panicked: {}", e),
            Err(_) => warn!("Discord shutdown timed out"),
        }
    }

    info!("Exiting...");
    Ok(())
}

/// Stdout logging, plus a plain-text file layer when `file` is set.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_logging(file: Option<&str>) -> Result<Option<WorkerGuard>> {
    let env_filter = || {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    };

    let (file_layer, guard) = match file {
        Some(path) => {
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(env_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(env_filter()),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
