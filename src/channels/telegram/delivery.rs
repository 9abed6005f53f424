//! Telegram Delivery and Download
//!
//! Bot API implementations of the pipeline's [`Downloader`] and [`Delivery`]
//! seams.

use super::{file_url, is_voice_container};
use crate::error::{DeliveryError, DownloadError};
use crate::pipeline::{Delivery, Downloader, HttpDownloader, SelectionEvent};
use crate::utils::format_bytes;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ReplyParameters};

/// Resolves Telegram file ids through `getFile`, then downloads over HTTP.
pub struct TelegramDownloader {
    bot: Bot,
    token: String,
    http: HttpDownloader,
}

impl TelegramDownloader {
    pub fn new(
        bot: Bot,
        token: impl Into<String>,
        max_bytes: u64,
        timeout: Duration,
    ) -> Result<Self, DownloadError> {
        Ok(Self {
            bot,
            token: token.into(),
            http: HttpDownloader::new(max_bytes, timeout)?,
        })
    }

    /// Keep the bot token out of error text.
    fn redact(&self, text: String) -> String {
        if self.token.is_empty() {
            text
        } else {
            text.replace(&self.token, "<token>")
        }
    }
}

#[async_trait]
impl Downloader for TelegramDownloader {
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>, DownloadError> {
        let file = self
            .bot
            .get_file(file_id.to_owned())
            .await
            .map_err(|e| DownloadError::Request(self.redact(e.to_string())))?;

        tracing::debug!("Telegram: downloading {}", file.path);
        self.http
            .fetch(&file_url(&self.token, &file.path))
            .await
            .map_err(|e| match e {
                DownloadError::Request(text) => DownloadError::Request(self.redact(text)),
                other => other,
            })
    }
}

/// Sends results and notices back to the originating chat.
pub struct TelegramDelivery {
    bot: Bot,
}

impl TelegramDelivery {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn reply_parameters(reply_to: i32) -> ReplyParameters {
    ReplyParameters::new(MessageId(reply_to)).allow_sending_without_reply()
}

fn transport(e: teloxide::RequestError) -> DeliveryError {
    DeliveryError::Transport(e.to_string())
}

#[async_trait]
impl Delivery for TelegramDelivery {
    async fn deliver(
        &self,
        conversation_id: i64,
        artifact: &Path,
        caption: &str,
        reply_to: Option<i32>,
    ) -> Result<(), DeliveryError> {
        let size = tokio::fs::metadata(artifact).await?.len();
        tracing::debug!(
            "Telegram: sending {} to chat {}",
            format_bytes(size),
            conversation_id
        );

        let chat = ChatId(conversation_id);
        let file = InputFile::file(artifact.to_path_buf());
        let extension = artifact
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        if is_voice_container(extension) {
            let mut request = self.bot.send_voice(chat, file).caption(caption);
            if let Some(id) = reply_to {
                request = request.reply_parameters(reply_parameters(id));
            }
            request.await.map_err(transport)?;
        } else {
            let mut request = self.bot.send_audio(chat, file).caption(caption);
            if let Some(id) = reply_to {
                request = request.reply_parameters(reply_parameters(id));
            }
            request.await.map_err(transport)?;
        }

        Ok(())
    }

    async fn notify(
        &self,
        conversation_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<(), DeliveryError> {
        let mut request = self.bot.send_message(ChatId(conversation_id), text);
        if let Some(id) = reply_to {
            request = request.reply_parameters(reply_parameters(id));
        }
        request.await.map_err(transport)?;
        Ok(())
    }

    async fn acknowledge(&self, event: &SelectionEvent) -> Result<(), DeliveryError> {
        self.bot
            .answer_callback_query(event.callback_id.clone())
            .await
            .map_err(transport)?;
        Ok(())
    }
}
