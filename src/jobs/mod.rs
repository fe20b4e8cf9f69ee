//! Periodic jobs: invite rotation and upload announcements.
//!
//! Each job runs on its own fixed-interval timer. A tick spawns the job body
//! and waits for it before the next tick, so a job never overlaps itself, and
//! a failing or panicking tick is logged without stopping the timer.

pub mod announce;
pub mod invite;
pub mod state;
pub mod sync;
pub mod youtube;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::types::Config;
use crate::discord::platform::ChatPlatform;
use announce::UploadAnnouncer;
use invite::InviteRotator;
use state::FileStore;
use sync::InviteSync;
use youtube::YouTubeClient;

/// A periodic unit of work.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn tick(&self) -> Result<()>;
}

/// Run `job` every `period` until shutdown. The first tick fires immediately.
pub fn spawn_job(job: Arc<dyn Job>, period: Duration, shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(run_job(job, period, shutdown_rx))
}

async fn run_job(job: Arc<dyn Job>, period: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Starting {} job (every {:?})", job.name(), period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
        }

        let mut run = tokio::spawn({
            let job = job.clone();
            async move { job.tick().await }
        });

        tokio::select! {
            result = &mut run => log_tick(job.name(), result),
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    warn!("Abandoning in-flight {} tick for shutdown", job.name());
                    run.abort();
                    break;
                }
                // Spurious change; let the tick finish before moving on
                log_tick(job.name(), run.await);
            }
        }
    }

    info!("{} job stopped", job.name());
}

fn log_tick(name: &str, result: Result<Result<()>, JoinError>) {
    match result {
        Ok(Ok(())) => debug!("{} tick complete", name),
        Ok(Err(e)) => error!("{} tick failed: {:#}", name, e),
        Err(e) => error!("{} tick panicked: {}", name, e),
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    Ok(client)
}

/// Build both jobs from config and start their timers.
pub async fn start_jobs(
    config: &Config,
    platform: Arc<dyn ChatPlatform>,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<Vec<JoinHandle<()>>> {
    let mut handles = Vec::new();

    let sync_config = &config.invites.sync;
    let sync = if sync_config.enabled {
        let client = http_client(Duration::from_secs(sync_config.timeout_secs))?;
        Some(InviteSync::new(
            client,
            sync_config.key_url.clone(),
            sync_config.update_url.clone(),
            sync_config.max_credential_refreshes,
        ))
    } else {
        info!("Invite sync disabled");
        None
    };

    let rotator = InviteRotator::new(
        platform.clone(),
        GuildId::new(config.discord.guild_id),
        ChannelId::new(config.invites.welcome_channel),
        config.invites.rotation_interval(),
        sync,
    );
    let period = rotator.interval();
    handles.push(spawn_job(Arc::new(rotator), period, shutdown_rx.clone()));

    match config.youtube {
        Some(ref youtube) if youtube.enabled => {
            let source = YouTubeClient::new(
                http_client(Duration::from_secs(30))?,
                youtube.api_base.as_deref(),
                youtube.api_key.clone(),
                youtube.channel_id.clone(),
            );
            let announcer = UploadAnnouncer::new(
                Arc::new(source),
                Arc::new(FileStore::new(&youtube.state_file)),
                platform,
                ChannelId::new(youtube.announcement_channel),
                youtube.announcement_format().to_string(),
                youtube.poll_interval(),
            );

            if let Some(ref seed) = youtube.seed_video {
                if let Err(e) = announcer.seed(seed).await {
                    warn!("Failed to seed last announced video: {}", e);
                }
            }

            let period = announcer.interval();
            handles.push(spawn_job(Arc::new(announcer), period, shutdown_rx));
        }
        _ => info!("Upload announcements disabled"),
    }

    Ok(handles)
}
