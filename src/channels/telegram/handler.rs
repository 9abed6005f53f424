//! Telegram Update Handlers
//!
//! Messages: `/start` and `/help`, recordings (voice notes, audio files and
//! audio documents) which get the effect menu, allowlist enforcement.
//! Callback queries: menu selections handed to the request coordinator.

use super::{effect_keyboard, extension_hint, help_text};
use crate::config::TelegramConfig;
use crate::pipeline::{RecordingRef, RequestCoordinator, SelectionEvent};
use crate::utils::format_bytes;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ReplyParameters;

/// A recording found in a message, before any download.
#[derive(Debug)]
struct IncomingRecording {
    reference: RecordingRef,
    size_bytes: u64,
}

fn incoming_recording(msg: &Message) -> Option<IncomingRecording> {
    if let Some(voice) = msg.voice() {
        return Some(IncomingRecording {
            reference: RecordingRef {
                source: voice.file.id.to_string(),
                extension: "ogg".to_string(),
                duration_secs: Some(voice.duration.seconds()),
            },
            size_bytes: voice.file.size as u64,
        });
    }

    if let Some(audio) = msg.audio() {
        let mime: Option<&str> = audio.mime_type.as_ref().map(AsRef::as_ref);
        return Some(IncomingRecording {
            reference: RecordingRef {
                source: audio.file.id.to_string(),
                extension: extension_hint(audio.file_name.as_deref(), mime, "mp3"),
                duration_secs: Some(audio.duration.seconds()),
            },
            size_bytes: audio.file.size as u64,
        });
    }

    if let Some(doc) = msg.document() {
        let mime: Option<&str> = doc.mime_type.as_ref().map(AsRef::as_ref);
        if !mime.is_some_and(|m| m.starts_with("audio/")) {
            return None;
        }
        return Some(IncomingRecording {
            reference: RecordingRef {
                source: doc.file.id.to_string(),
                extension: extension_hint(doc.file_name.as_deref(), mime, "bin"),
                duration_secs: None,
            },
            size_bytes: doc.file.size as u64,
        });
    }

    None
}

pub(crate) async fn handle_message(
    bot: Bot,
    msg: Message,
    config: Arc<TelegramConfig>,
    coordinator: Arc<RequestCoordinator>,
) -> ResponseResult<()> {
    let user = match msg.from {
        Some(ref u) => u,
        None => return Ok(()),
    };

    let user_id = user.id.0 as i64;

    if let Some(text) = msg.text()
        && (text.starts_with("/start") || text.starts_with("/help"))
    {
        bot.send_message(msg.chat.id, help_text(coordinator.catalog()))
            .await?;
        tracing::info!("Telegram: help for user {} ({})", user_id, user.first_name);
        return Ok(());
    }

    if !config.is_allowed(user_id) {
        tracing::debug!("Telegram: ignoring message from non-allowed user {}", user_id);
        bot.send_message(msg.chat.id, "You are not authorized to use this bot.")
            .await?;
        return Ok(());
    }

    let Some(recording) = incoming_recording(&msg) else {
        if msg.document().is_some() {
            bot.send_message(msg.chat.id, "Only audio files are supported.")
                .await?;
        } else if msg.text().is_some() {
            bot.send_message(msg.chat.id, "Send me a voice message to get started 🎙")
                .await?;
        }
        return Ok(());
    };

    if recording.size_bytes > config.max_file_bytes {
        tracing::info!(
            "Telegram: refusing {} recording from user {} (limit {})",
            format_bytes(recording.size_bytes),
            user_id,
            format_bytes(config.max_file_bytes)
        );
        bot.send_message(
            msg.chat.id,
            format!(
                "That recording is too large. Please send something under {}.",
                format_bytes(config.max_file_bytes)
            ),
        )
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
        return Ok(());
    }

    tracing::info!(
        "Telegram: {} recording from user {} ({}), {}s",
        recording.reference.extension,
        user_id,
        user.first_name,
        recording.reference.duration_secs.unwrap_or_default()
    );

    bot.send_message(msg.chat.id, "🎛 Choose an effect:")
        .reply_markup(effect_keyboard(coordinator.catalog()))
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;

    Ok(())
}

pub(crate) async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    config: Arc<TelegramConfig>,
    coordinator: Arc<RequestCoordinator>,
) -> ResponseResult<()> {
    let user_id = q.from.id.0 as i64;

    if !config.is_allowed(user_id) {
        tracing::debug!("Telegram: ignoring selection from non-allowed user {}", user_id);
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    }

    let menu = q.regular_message();
    let recording_msg = menu.and_then(|m| m.reply_to_message());

    let event = SelectionEvent {
        conversation_id: menu.map(|m| m.chat.id.0).unwrap_or(user_id),
        menu_message_id: menu.map(|m| m.id.0),
        reply_to: recording_msg.map(|m| m.id.0),
        recording: recording_msg
            .and_then(incoming_recording)
            .map(|incoming| incoming.reference),
        effect_token: q.data.clone().unwrap_or_default(),
        callback_id: q.id.to_string(),
    };

    tracing::info!(
        "Telegram: selection {:?} from user {} in chat {}",
        event.effect_token,
        user_id,
        event.conversation_id
    );

    // Transforms run off the dispatcher; the coordinator acknowledges.
    tokio::spawn(async move {
        coordinator.handle(event).await;
    });

    Ok(())
}
