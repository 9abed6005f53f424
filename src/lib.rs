//! VoiceMorph - Telegram Voice Transformation Bot
//!
//! Users send a voice message, pick an effect from the menu under it, and get
//! the transformed recording back. Effects are fixed chains of audio
//! operations compiled into ffmpeg filter graphs.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run the bot
//! TELEGRAM_BOT_TOKEN=123:abc voicemorph
//!
//! # Try an effect locally
//! voicemorph apply --effect male_to_female --input memo.ogg --output memo.mp3
//! ```

pub mod channels;
pub mod cli;
pub mod config;
pub mod effects;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use error::{ErrorKind, VoiceMorphError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
