//! Telegram Bot Integration
//!
//! Offers the effect menu under every recording a user sends and turns menu
//! selections into [`SelectionEvent`](crate::pipeline::SelectionEvent)s for
//! the request coordinator.

mod agent;
mod delivery;
pub(crate) mod handler;

pub use agent::TelegramAgent;
pub use delivery::{TelegramDelivery, TelegramDownloader};

use crate::effects::EffectCatalog;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Telegram Bot API endpoint for file downloads.
pub const TELEGRAM_FILE_BASE: &str = "https://api.telegram.org/file";

/// Download URL for a file path returned by `getFile`.
pub(crate) fn file_url(token: &str, file_path: &str) -> String {
    format!("{}/bot{}/{}", TELEGRAM_FILE_BASE, token, file_path)
}

/// One button per catalog effect, in menu order. Callback data is the
/// effect token.
pub(crate) fn effect_keyboard(catalog: &EffectCatalog) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = catalog
        .iter()
        .map(|effect| {
            vec![InlineKeyboardButton::callback(
                effect.label,
                effect.id.as_str(),
            )]
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Usage text for `/start` and `/help`.
pub(crate) fn help_text(catalog: &EffectCatalog) -> String {
    let mut text = String::from(
        "🎙 Send me a voice message or an audio file, then pick an effect from the menu under it.\n\nEffects:\n",
    );
    for effect in catalog.iter() {
        text.push_str(&format!("{} - {}\n", effect.label, effect.description));
    }
    text
}

/// Best-effort extension for a recording: file name first, then MIME type,
/// then `fallback`.
pub(crate) fn extension_hint(
    file_name: Option<&str>,
    mime_type: Option<&str>,
    fallback: &str,
) -> String {
    if let Some(ext) = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
    {
        return ext.to_ascii_lowercase();
    }

    let from_mime = mime_type.and_then(|mime| match mime {
        "audio/ogg" | "audio/opus" => Some("ogg"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/mp4" | "audio/x-m4a" | "audio/m4a" => Some("m4a"),
        "audio/aac" => Some("aac"),
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/webm" => Some("webm"),
        _ => None,
    });

    from_mime.unwrap_or(fallback).to_string()
}

/// Ogg/Opus results go out as voice notes, everything else as audio files.
pub(crate) fn is_voice_container(extension: &str) -> bool {
    matches!(extension, "ogg" | "oga" | "opus")
}
