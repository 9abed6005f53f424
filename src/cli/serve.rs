//! `voicemorph serve`: the Telegram bot plus the liveness endpoint.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::gateway;
use crate::pipeline::{ArtifactStore, AudioEngine, FfmpegEngine};

pub(crate) async fn cmd_serve(config: &Config) -> Result<()> {
    let store = Arc::new(
        ArtifactStore::new(&config.storage.temp_dir).with_context(|| {
            format!(
                "Failed to create temp directory {}",
                config.storage.temp_dir.display()
            )
        })?,
    );
    let engine = FfmpegEngine::discover(config.engine.ffmpeg_path.as_deref())
        .context("ffmpeg is required to serve requests")?;
    tracing::info!("Using ffmpeg at {}", engine.ffmpeg_path().display());
    let engine: Arc<dyn AudioEngine> = Arc::new(engine);

    let gateway_task = if config.gateway.enabled {
        let gateway_config = config.gateway.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = gateway::serve(&gateway_config).await {
                tracing::error!("Liveness endpoint failed: {:#}", e);
            }
        }))
    } else {
        None
    };

    let bot_task = start_telegram(config, store, engine)?;

    match bot_task {
        Some(bot_task) => {
            tokio::select! {
                result = bot_task => {
                    if let Err(e) = result {
                        tracing::error!("Telegram bot task failed: {}", e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutting down");
                }
            }
        }
        None if gateway_task.is_some() => {
            tracing::warn!("Telegram bot disabled; serving the liveness endpoint only");
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            tracing::info!("Shutting down");
        }
        None => anyhow::bail!("Nothing to serve: both Telegram and the gateway are disabled"),
    }

    if let Some(task) = gateway_task {
        task.abort();
    }
    Ok(())
}

#[cfg(feature = "telegram")]
fn start_telegram(
    config: &Config,
    store: Arc<ArtifactStore>,
    engine: Arc<dyn AudioEngine>,
) -> Result<Option<JoinHandle<()>>> {
    use crate::channels::telegram::{TelegramAgent, TelegramDelivery, TelegramDownloader};
    use crate::pipeline::{RequestCoordinator, TransformPipeline};
    use teloxide::Bot;

    if !config.telegram.enabled {
        return Ok(None);
    }

    let token = config
        .telegram
        .token
        .clone()
        .context("Telegram bot token not set (TELEGRAM_BOT_TOKEN)")?;

    let bot = Bot::new(token.clone());
    let downloader = TelegramDownloader::new(
        bot.clone(),
        token,
        config.telegram.max_file_bytes,
        config.telegram.download_timeout(),
    )?;
    let pipeline = TransformPipeline::new(
        store,
        Arc::new(downloader),
        engine,
        config.pipeline_settings(),
    );
    let coordinator = Arc::new(RequestCoordinator::new(
        Arc::new(pipeline),
        Arc::new(TelegramDelivery::new(bot.clone())),
    ));

    Ok(Some(
        TelegramAgent::new(coordinator, config.telegram.clone()).start(bot),
    ))
}

#[cfg(not(feature = "telegram"))]
fn start_telegram(
    config: &Config,
    _store: Arc<ArtifactStore>,
    _engine: Arc<dyn AudioEngine>,
) -> Result<Option<JoinHandle<()>>> {
    if config.telegram.enabled {
        tracing::warn!("Built without the `telegram` feature; the bot will not start");
    }
    Ok(None)
}
