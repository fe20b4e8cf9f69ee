//! Discord bot client.
//!
//! Owns the gateway connection, forwards serenity events into a channel and
//! processes them on a single task. Periodic jobs start on the first Ready.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use serenity::http::HttpBuilder;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use serenity::Client;

use backon::BackoffBuilder;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::types::Config;
use crate::discord::handler::ModerationHandler;
use crate::discord::platform::{ChatPlatform, SerenityPlatform};
use crate::jobs;

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub enum DiscordBotEvent {
    /// Bot connected and ready.
    Ready { context: Context, ready: Ready },
    /// Message received.
    Message {
        context: Context,
        message: serenity::model::channel::Message,
    },
    Disconnected,
}

struct DiscordBotEvents {
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
}

impl DiscordBotEvents {
    fn new(discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>) -> Self {
        Self { discord_events_tx }
    }
}

#[async_trait]
impl EventHandler for DiscordBotEvents {
    async fn ready(&self, context: Context, ready: Ready) {
        if let Err(error) = self.discord_events_tx.send(DiscordBotEvent::Ready { context, ready }) {
            warn!("Failed to process discord event: {}", error);
        }
    }

    async fn message(&self, context: Context, message: serenity::model::channel::Message) {
        if let Err(error) = self.discord_events_tx.send(DiscordBotEvent::Message { context, message }) {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

/// Builder for creating the Discord bot.
pub struct DiscordBotBuilder {
    config: Config,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBotBuilder {
    pub fn new(config: Config, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self { config, shutdown_rx }
    }

    /// Build the Discord bot.
    pub async fn build(self) -> anyhow::Result<DiscordBot> {
        let (discord_events_tx, discord_events_rx) = mpsc::unbounded_channel::<DiscordBotEvent>();

        let client = build_client(&self.config.discord.token, discord_events_tx.clone()).await?;
        let handler = ModerationHandler::new(&self.config);

        Ok(DiscordBot {
            client: Some(client),
            token: self.config.discord.token.clone(),
            config: self.config,
            handler,
            discord_events_rx,
            discord_events_tx,
            shutdown_rx: self.shutdown_rx,
        })
    }
}

async fn build_client(token: &str, discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>) -> anyhow::Result<Client> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_INVITES
        | GatewayIntents::DIRECT_MESSAGES;

    // Build a custom reqwest client with timeout settings
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let events = DiscordBotEvents::new(discord_events_tx);
    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(events)
        .await?;
    Ok(client)
}

pub struct DiscordBot {
    client: Option<Client>,
    token: String,
    config: Config,
    handler: ModerationHandler,
    discord_events_rx: mpsc::UnboundedReceiver<DiscordBotEvent>,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBot {
    pub async fn run(mut self) {
        // Extract shard manager before we move client into run_connection
        let shard_manager = self.client.as_ref().map(|c| c.shard_manager.clone());
        let shutdown_rx = self.shutdown_rx.clone();
        let jobs_shutdown_rx = self.shutdown_rx.clone();
        let mut job_handles = Vec::new();

        let work = async {
            tokio::select! {
                _ = Self::run_connection(&mut self.client, &self.token, &self.discord_events_tx) => {},
                _ = Self::process_events(
                    &mut self.discord_events_rx,
                    &self.handler,
                    &self.config,
                    &mut job_handles,
                    jobs_shutdown_rx,
                ) => {},
            }
        };
        let shutdown_requested = run_until_shutdown(work, shutdown_rx).await;

        // Gracefully shutdown Discord gateway
        if shutdown_requested {
            if let Some(ref manager) = shard_manager {
                info!("Initiating graceful Discord shutdown...");
                manager.shutdown_all().await;
                info!("Discord shutdown complete");
            }
        }

        // Jobs watch the same shutdown channel; wait for them to wind down
        for handle in job_handles {
            if let Err(e) = handle.await {
                warn!("Job task ended abnormally: {}", e);
            }
        }
        info!("Discord task ended");
    }

    async fn run_connection(
        client: &mut Option<Client>,
        token: &str,
        discord_events_tx: &mpsc::UnboundedSender<DiscordBotEvent>,
    ) {
        /// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
        fn discord_backoff() -> impl Iterator<Item = Duration> {
            backon::ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(5))
                .with_max_delay(MAX_RECONNECT_DELAY)
                .with_factor(1.1)
                .with_jitter()
                .without_max_times()
                .build()
        }

        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");

            let mut client = match client.take() {
                Some(client) => client,
                None => match build_client(token, discord_events_tx.clone()).await {
                    Ok(client) => {
                        backoff = discord_backoff();
                        client
                    }
                    Err(e) => {
                        error!("Failed to rebuild Discord client: {}", e);
                        let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                        warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                        sleep(delay).await;
                        continue;
                    }
                },
            };

            match client.start().await {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected) {
                        warn!("Failed to process discord event: {}", error);
                    }
                    break;
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64(),
                    );
                    if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected) {
                        warn!("Failed to process discord event: {}", error);
                    }
                    sleep(delay).await;
                }
            }
        }
    }

    async fn process_events(
        discord_events_rx: &mut mpsc::UnboundedReceiver<DiscordBotEvent>,
        handler: &ModerationHandler,
        config: &Config,
        job_handles: &mut Vec<JoinHandle<()>>,
        shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut jobs_started = false;

        while let Some(event) = discord_events_rx.recv().await {
            match event {
                DiscordBotEvent::Ready { context, ready } => {
                    info!("Discord bot connected as {}", ready.user.name);
                    if jobs_started {
                        continue;
                    }
                    let platform: Arc<dyn ChatPlatform> = Arc::new(SerenityPlatform::new(
                        context.http.clone(),
                        context.cache.clone(),
                    ));
                    match jobs::start_jobs(config, platform, shutdown_rx.clone()).await {
                        Ok(handles) => {
                            job_handles.extend(handles);
                            jobs_started = true;
                        }
                        Err(e) => error!("Failed to start periodic jobs: {:#}", e),
                    }
                }
                DiscordBotEvent::Message { context, message } => {
                    handler.handle_message(&context, message).await;
                }
                DiscordBotEvent::Disconnected => {
                    debug!("Discord connection lost");
                }
            }
        }
        debug!("Discord events channel closed.");
    }
}

async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}

/// Drive `work` until it finishes or shutdown is signalled.
///
/// Returns whether shutdown was requested, whichever side finished first.
async fn run_until_shutdown(work: impl Future<Output = ()>, mut shutdown_rx: watch::Receiver<bool>) -> bool {
    tokio::select! {
        biased;
        _ = wait_for_shutdown(&mut shutdown_rx) => {
            info!("Shutdown signal received, stopping event processing");
        }
        _ = work => {}
    }
    let requested = *shutdown_rx.borrow();
    requested
}
