//! Error Types
//!
//! Per-collaborator error enums plus the [`ErrorKind`] classification used to
//! pick the notice a user sees.

use crate::effects::{BuildError, CatalogError};
use std::time::Duration;
use thiserror::Error;

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The selection did not point at a recording
    NoRecording,
    /// The effect token is not in the catalog
    UnknownEffect,
    /// Fetching or storing the source recording failed
    Download,
    /// The audio engine failed, timed out, or the chain could not be compiled
    Engine,
    /// The chat platform rejected a delivery
    Delivery,
}

impl ErrorKind {
    /// Precondition failures are the user's to fix and are never retried.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NoRecording | Self::UnknownEffect)
    }

    /// Notice shown to the user. Never includes engine diagnostics.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoRecording => {
                "Please reply to a voice message (or send one first) and then pick an effect."
            }
            Self::UnknownEffect => "That effect isn't available. Please pick one from the menu.",
            Self::Download => "Sorry, I couldn't download your recording. Please try again.",
            Self::Engine => "Sorry, I couldn't process your recording. Please try another one.",
            Self::Delivery => "Sorry, I couldn't send the result back.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoRecording => "no_recording",
            Self::UnknownEffect => "unknown_effect",
            Self::Download => "download",
            Self::Engine => "engine",
            Self::Delivery => "delivery",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Download failed with HTTP status {0}")]
    Status(u16),

    #[error("Download request failed: {0}")]
    Request(String),

    #[error("Download timed out")]
    TimedOut,

    #[error("Downloaded recording is empty")]
    Empty,

    #[error("Recording is too large ({size} bytes, limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("Failed to store recording: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Audio engine not found: {0}")]
    NotFound(String),

    #[error("Failed to start audio engine: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Audio engine exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("Audio engine produced no output")]
    EmptyOutput,

    #[error("Audio engine timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Audio engine failed ({primary}); pass-through fallback also failed ({fallback})")]
    FallbackFailed {
        primary: Box<EngineError>,
        fallback: Box<EngineError>,
    },
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Delivery failed: {0}")]
    Transport(String),

    #[error("Artifact unreadable: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella error for one transformation request.
#[derive(Debug, Error)]
pub enum VoiceMorphError {
    #[error("No recording referenced")]
    NoRecording,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Filter chain rejected: {0}")]
    Build(#[from] BuildError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl VoiceMorphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoRecording => ErrorKind::NoRecording,
            Self::Catalog(_) => ErrorKind::UnknownEffect,
            Self::Build(_) | Self::Engine(_) => ErrorKind::Engine,
            Self::Download(_) => ErrorKind::Download,
            Self::Delivery(_) => ErrorKind::Delivery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_classification() {
        assert_eq!(VoiceMorphError::NoRecording.kind(), ErrorKind::NoRecording);
        assert_eq!(
            VoiceMorphError::from(CatalogError::UnknownEffect("x".into())).kind(),
            ErrorKind::UnknownEffect
        );
        assert_eq!(
            VoiceMorphError::from(DownloadError::Status(404)).kind(),
            ErrorKind::Download
        );
        assert_eq!(
            VoiceMorphError::from(BuildError::EmptyChain).kind(),
            ErrorKind::Engine
        );
        assert_eq!(
            VoiceMorphError::from(EngineError::TimedOut(Duration::from_secs(5))).kind(),
            ErrorKind::Engine
        );
        assert_eq!(
            VoiceMorphError::from(DeliveryError::Transport("blocked".into())).kind(),
            ErrorKind::Delivery
        );
        assert_eq!(
            VoiceMorphError::from(DownloadError::TimedOut).kind(),
            ErrorKind::Download
        );
    }

    #[test]
    fn test_preconditions() {
        assert!(ErrorKind::NoRecording.is_precondition());
        assert!(ErrorKind::UnknownEffect.is_precondition());
        assert!(!ErrorKind::Engine.is_precondition());
        assert!(!ErrorKind::Download.is_precondition());
    }

    #[test]
    fn test_user_message_hides_diagnostics() {
        let err = EngineError::Failed {
            status: Some(1),
            stderr: "Invalid data found when processing input".to_string(),
        };
        let kind = VoiceMorphError::from(err).kind();
        assert!(!kind.user_message().contains("Invalid data"));
    }

    #[test]
    fn test_fallback_failed_message_includes_both() {
        let err = EngineError::FallbackFailed {
            primary: Box::new(EngineError::TimedOut(Duration::from_secs(1))),
            fallback: Box::new(EngineError::EmptyOutput),
        };
        let text = err.to_string();
        assert!(text.contains("timed out"));
        assert!(text.contains("no output"));
    }
}
