//! Configuration Module
//!
//! Handles application configuration loading, validation, and management.

pub mod types;

pub use types::{
    EngineConfig, GatewayConfig, LoggingConfig, StorageConfig, TELEGRAM_MAX_FILE_BYTES,
    TelegramConfig,
};

use crate::pipeline::PipelineSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. System config: ~/.config/voicemorph/config.toml
    /// 3. Local config: ./voicemorph.toml
    /// 4. Environment variables
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading configuration...");

        let mut config = Self::default();

        if let Some(system_config_path) = Self::system_config_path()
            && system_config_path.exists()
        {
            tracing::debug!("Loading system config from: {:?}", system_config_path);
            config = Self::merge_from_file(&system_config_path)?;
        }

        let local_config_path = Self::local_config_path();
        if local_config_path.exists() {
            tracing::debug!("Loading local config from: {:?}", local_config_path);
            config = Self::merge_from_file(&local_config_path)?;
        }

        config = Self::apply_env_overrides(config, |key| std::env::var(key).ok())?;

        tracing::debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply environment
    /// overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from custom path: {:?}", path);

        if !path.exists() {
            anyhow::bail!("Config file not found: {:?}", path);
        }
        let config = Self::merge_from_file(path)?;
        Self::apply_env_overrides(config, |key| std::env::var(key).ok())
    }

    /// ~/.config/voicemorph/config.toml
    pub fn system_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("voicemorph").join("config.toml"))
    }

    /// ./voicemorph.toml
    pub fn local_config_path() -> PathBuf {
        PathBuf::from("./voicemorph.toml")
    }

    /// A later file replaces earlier sections wholesale; missing sections
    /// fall back to defaults.
    fn merge_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    fn apply_env_overrides<F>(mut config: Self, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = env("TELEGRAM_BOT_TOKEN").or_else(|| env("BOT_TOKEN"))
            && !token.trim().is_empty()
        {
            config.telegram.token = Some(token.trim().to_string());
        }

        if let Some(port) = env("PORT") {
            config.gateway.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT: {:?}", port))?;
        }

        if let Some(level) = env("VOICEMORPH_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(file) = env("VOICEMORPH_LOG_FILE") {
            config.logging.file = Some(PathBuf::from(file));
        }

        if let Some(path) = env("VOICEMORPH_FFMPEG_PATH") {
            config.engine.ffmpeg_path = Some(PathBuf::from(path));
        }

        if let Some(dir) = env("VOICEMORPH_TEMP_DIR") {
            config.storage.temp_dir = PathBuf::from(dir);
        }

        if let Some(secs) = env("VOICEMORPH_ENGINE_TIMEOUT") {
            config.engine.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("Invalid VOICEMORPH_ENGINE_TIMEOUT: {:?}", secs))?;
        }

        if let Some(secs) = env("VOICEMORPH_DOWNLOAD_TIMEOUT") {
            config.telegram.download_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("Invalid VOICEMORPH_DOWNLOAD_TIMEOUT: {:?}", secs))?;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            );
        }

        let engine = &self.engine;
        if engine.timeout_secs == 0 {
            anyhow::bail!("engine.timeout_secs must be greater than zero");
        }
        if !(8_000..=192_000).contains(&engine.sample_rate) {
            anyhow::bail!("engine.sample_rate out of range: {}", engine.sample_rate);
        }
        if !(1..=2).contains(&engine.channels) {
            anyhow::bail!("engine.channels must be 1 or 2, got {}", engine.channels);
        }
        for (name, value) in [
            ("codec", &engine.codec),
            ("bitrate", &engine.bitrate),
            ("container", &engine.container),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("engine.{} must not be empty", name);
            }
        }

        if self.telegram.max_file_bytes == 0 {
            anyhow::bail!("telegram.max_file_bytes must be greater than zero");
        }
        if self.telegram.download_timeout_secs == 0 {
            anyhow::bail!("telegram.download_timeout_secs must be greater than zero");
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Pipeline settings derived from `[engine]`.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            encoding: self.engine.encoding(),
            engine_timeout: self.engine.timeout(),
            fallback: self.engine.fallback,
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Configuration saved to: {:?}", path);
        Ok(())
    }
}
