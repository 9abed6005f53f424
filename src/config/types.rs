//! Configuration section types and their defaults.

use crate::pipeline::{FallbackPolicy, TargetEncoding};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Telegram Bot API ceiling for `getFile` downloads.
pub const TELEGRAM_MAX_FILE_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log to this file instead of the rolling log directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot front-end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bot token; usually supplied through `TELEGRAM_BOT_TOKEN`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// User ids allowed to use the bot. Empty allows everyone.
    #[serde(default)]
    pub allowed_users: Vec<i64>,

    /// Recordings larger than this are refused before download
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Upper bound on fetching one recording
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token: None,
            allowed_users: Vec::new(),
            max_file_bytes: default_max_file_bytes(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

impl TelegramConfig {
    pub fn is_allowed(&self, user_id: i64) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.contains(&user_id)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

fn default_true() -> bool {
    true
}

fn default_max_file_bytes() -> u64 {
    TELEGRAM_MAX_FILE_BYTES
}

fn default_download_timeout_secs() -> u64 {
    60
}

/// Audio engine and output encoding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// ffmpeg binary; looked up on `PATH` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,

    /// Wall-clock limit for one engine invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_codec")]
    pub codec: String,

    #[serde(default = "default_bitrate")]
    pub bitrate: String,

    #[serde(default = "default_container")]
    pub container: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u8,

    #[serde(default)]
    pub fallback: FallbackPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            timeout_secs: default_timeout_secs(),
            codec: default_codec(),
            bitrate: default_bitrate(),
            container: default_container(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            fallback: FallbackPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn encoding(&self) -> TargetEncoding {
        TargetEncoding {
            codec: self.codec.clone(),
            bitrate: self.bitrate.clone(),
            container: self.container.clone(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_codec() -> String {
    "libmp3lame".to_string()
}

fn default_bitrate() -> String {
    "128k".to_string()
}

fn default_container() -> String {
    "mp3".to_string()
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_channels() -> u8 {
    1
}

/// Scratch space for transient artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
        }
    }
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("voicemorph")
}

/// Liveness HTTP endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bind address (default: "0.0.0.0")
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Port (default: 3000, or `PORT`)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_gateway_bind(),
            port: default_gateway_port(),
        }
    }
}

impl GatewayConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}
