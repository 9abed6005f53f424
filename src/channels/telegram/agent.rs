//! Telegram Agent
//!
//! Agent struct and startup logic.

use super::handler::{handle_callback, handle_message};
use crate::config::TelegramConfig;
use crate::pipeline::RequestCoordinator;
use std::sync::Arc;
use teloxide::prelude::*;

/// Telegram bot that routes recordings and menu selections to the
/// request coordinator
pub struct TelegramAgent {
    coordinator: Arc<RequestCoordinator>,
    config: TelegramConfig,
}

impl TelegramAgent {
    pub fn new(coordinator: Arc<RequestCoordinator>, config: TelegramConfig) -> Self {
        Self {
            coordinator,
            config,
        }
    }

    /// Start the bot as a background task. Returns a JoinHandle.
    pub fn start(self, bot: Bot) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                "Starting Telegram bot with {} effect(s), {} allowed user(s)",
                self.coordinator.catalog().len(),
                if self.config.allowed_users.is_empty() {
                    "all".to_string()
                } else {
                    self.config.allowed_users.len().to_string()
                },
            );

            match bot.get_me().await {
                Ok(me) => {
                    if let Some(ref username) = me.username {
                        tracing::info!("Telegram: bot username is @{}", username);
                    }
                }
                Err(e) => {
                    tracing::warn!("Telegram: failed to get bot info (get_me): {}", e);
                }
            }

            let config = Arc::new(self.config);
            let coordinator = self.coordinator;

            let message_config = config.clone();
            let message_coordinator = coordinator.clone();
            let handler = dptree::entry()
                .branch(Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                    let config = message_config.clone();
                    let coordinator = message_coordinator.clone();
                    async move { handle_message(bot, msg, config, coordinator).await }
                }))
                .branch(
                    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                        let config = config.clone();
                        let coordinator = coordinator.clone();
                        async move { handle_callback(bot, q, config, coordinator).await }
                    }),
                );

            Dispatcher::builder(bot, handler)
                .enable_ctrlc_handler()
                .build()
                .dispatch()
                .await;

            tracing::info!("Telegram bot stopped");
        })
    }
}
