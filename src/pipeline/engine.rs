//! Audio Engine
//!
//! The [`AudioEngine`] seam and the ffmpeg subprocess implementation.

use crate::effects::FilterGraph;
use crate::error::EngineError;
use crate::utils::truncate_str;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Max stderr bytes kept for logs.
const STDERR_LIMIT: usize = 2000;

/// Output encoding requested from the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEncoding {
    /// ffmpeg audio codec, e.g. `libmp3lame`, `libopus`
    pub codec: String,
    /// Bitrate in ffmpeg notation, e.g. `128k`
    pub bitrate: String,
    /// Container / muxer name, also used as the output file extension
    pub container: String,
    pub sample_rate: u32,
    /// 1 = mono, 2 = stereo
    pub channels: u8,
}

impl Default for TargetEncoding {
    fn default() -> Self {
        Self {
            codec: "libmp3lame".to_string(),
            bitrate: "128k".to_string(),
            container: "mp3".to_string(),
            sample_rate: 44_100,
            channels: 1,
        }
    }
}

impl TargetEncoding {
    /// File extension for artifacts in this container.
    pub fn extension(&self) -> &str {
        match self.container.as_str() {
            "ipod" => "m4a",
            "adts" => "aac",
            other => other,
        }
    }
}

/// One engine run.
///
/// `filter: None` is a pass-through re-encode.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineInvocation {
    pub input: PathBuf,
    pub output: PathBuf,
    pub filter: Option<FilterGraph>,
    pub encoding: TargetEncoding,
}

impl EngineInvocation {
    pub fn is_pass_through(&self) -> bool {
        self.filter.is_none()
    }

    /// The same input, output and encoding with no filter graph.
    pub fn pass_through(&self) -> Self {
        Self {
            filter: None,
            ..self.clone()
        }
    }
}

/// Runs one invocation to completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioEngine: Send + Sync {
    async fn run(&self, invocation: &EngineInvocation) -> Result<(), EngineError>;
}

/// ffmpeg subprocess engine.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg_path: PathBuf,
}

impl FfmpegEngine {
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self { ffmpeg_path }
    }

    /// Use the configured binary, or find `ffmpeg` on `PATH`.
    pub fn discover(configured: Option<&Path>) -> Result<Self, EngineError> {
        match configured {
            Some(path) if path.exists() => Ok(Self::new(path.to_path_buf())),
            Some(path) => Err(EngineError::NotFound(path.display().to_string())),
            None => which::which("ffmpeg")
                .map(Self::new)
                .map_err(|e| EngineError::NotFound(format!("ffmpeg not on PATH ({})", e))),
        }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    /// Command-line arguments for `invocation`.
    pub fn args(invocation: &EngineInvocation) -> Vec<OsString> {
        let enc = &invocation.encoding;
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            invocation.input.clone().into(),
            "-vn".into(),
        ];

        if let Some(ref filter) = invocation.filter {
            args.push("-af".into());
            args.push(filter.as_str().into());
        }

        let tail: [OsString; 11] = [
            "-ac".into(),
            enc.channels.to_string().into(),
            "-ar".into(),
            enc.sample_rate.to_string().into(),
            "-c:a".into(),
            enc.codec.clone().into(),
            "-b:a".into(),
            enc.bitrate.clone().into(),
            "-f".into(),
            enc.container.clone().into(),
            invocation.output.clone().into(),
        ];
        args.extend(tail);

        args
    }
}

#[async_trait]
impl AudioEngine for FfmpegEngine {
    async fn run(&self, invocation: &EngineInvocation) -> Result<(), EngineError> {
        tracing::debug!(
            "ffmpeg: {} -> {} (filter: {})",
            invocation.input.display(),
            invocation.output.display(),
            invocation
                .filter
                .as_ref()
                .map(|f| f.as_str())
                .unwrap_or("pass-through"),
        );

        let output = Command::new(&self.ffmpeg_path)
            .args(Self::args(invocation))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(EngineError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Failed {
                status: output.status.code(),
                stderr: truncate_str(stderr.trim(), STDERR_LIMIT).to_string(),
            });
        }

        match tokio::fs::metadata(&invocation.output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(EngineError::EmptyOutput),
        }
    }
}
