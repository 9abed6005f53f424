//! Logging
//!
//! `tracing` subscriber setup: a human-readable stderr layer always, plus a
//! JSON file layer with daily rotation when debug mode or a log file is set.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE_PREFIX: &str = "voicemorph";

/// Logging options resolved from CLI flags and config.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub debug_mode: bool,
    pub level: String,
    pub log_dir: PathBuf,
    /// Explicit log file; rotation is disabled when set
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self {
            debug_mode: false,
            level: "info".to_string(),
            log_dir: log_dir(),
            file: None,
        }
    }

    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug_mode = debug;
        if debug {
            self.level = "debug".to_string();
        }
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        if !self.debug_mode {
            self.level = level.into();
        }
        self
    }

    pub fn with_file(mut self, file: Option<PathBuf>) -> Self {
        self.file = file;
        self
    }

    fn writes_file(&self) -> bool {
        self.debug_mode || self.file.is_some()
    }

    /// `RUST_LOG` wins over the configured level.
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "voicemorph={lvl},teloxide=warn,reqwest=warn,hyper=warn,{lvl}",
                lvl = self.level
            ))
        })
    }
}

/// Install the global subscriber. Hold the returned guard for the life of
/// the process or buffered file output is lost.
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    if !config.writes_file() {
        tracing_subscriber::registry()
            .with(config.filter())
            .with(stderr_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;
        return Ok(None);
    }

    let appender = match &config.file {
        Some(file) => {
            let dir = file.parent().unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let name = file
                .file_name()
                .context("Log file path has no file name")?;
            tracing_appender::rolling::never(dir, name)
        }
        None => {
            std::fs::create_dir_all(&config.log_dir).with_context(|| {
                format!("Failed to create log directory {}", config.log_dir.display())
            })?;
            tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX)
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(config.filter())
        .with(stderr_layer)
        .with(fmt::layer().json().with_writer(writer).with_ansi(false))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!("File logging enabled (level {})", config.level);
    Ok(Some(guard))
}

/// Default directory for rolled log files.
pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("voicemorph")
        .join("logs")
}

/// Newest log file in the default directory.
pub fn get_log_path() -> Option<PathBuf> {
    newest_log_in(&log_dir())
}

fn newest_log_in(dir: &Path) -> Option<PathBuf> {
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| is_log_file(&entry.path()))
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((modified, entry.path()))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

fn is_log_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
}

/// Remove rolled log files older than `days`. Returns how many were removed.
pub fn cleanup_old_logs(days: u64) -> Result<usize> {
    cleanup_logs_in(&log_dir(), days)
}

fn cleanup_logs_in(dir: &Path, days: u64) -> Result<usize> {
    let cutoff = i64::try_from(days)
        .ok()
        .and_then(chrono::TimeDelta::try_days)
        .and_then(|age| chrono::Utc::now().checked_sub_signed(age))
        .with_context(|| format!("Log retention of {} days is out of range", days))?;

    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read log directory {}", dir.display()))?
    {
        let path = entry?.path();
        if !is_log_file(&path) {
            continue;
        }
        let modified: chrono::DateTime<chrono::Utc> = std::fs::metadata(&path)?.modified()?.into();
        if modified < cutoff {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
    }

    Ok(removed)
}
