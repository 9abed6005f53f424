//! Primitive audio operations that make up an effect chain.

use serde::Serialize;

/// One primitive audio-processing step.
///
/// Values are plain data; the ffmpeg rendering lives in
/// [`FilterChainBuilder`](super::FilterChainBuilder).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OperationSpec {
    /// Reinterpret the sample rate as `base * factor` (raises pitch and speed together)
    RateShift { factor: f64 },
    /// Resample back to a concrete output rate
    Resample { target_rate: u32 },
    /// Change tempo without touching pitch
    TempoCorrect { factor: f64 },
    /// Peaking equalizer band; `bandwidth` is in Hz
    Equalize {
        center_hz: f64,
        bandwidth_hz: f64,
        gain_db: f64,
    },
    /// Dynamic range compressor
    Compress {
        threshold_db: f64,
        ratio: f64,
        attack_ms: f64,
        release_ms: f64,
    },
    /// Echo / short reverb
    Echo {
        in_gain: f64,
        out_gain: f64,
        delay_ms: f64,
        decay: f64,
    },
    /// Low-pass filter
    LowPass { cutoff_hz: f64 },
}

/// Where an operation sits in a chain.
///
/// Timing operations establish the signal's rate and duration; spectral
/// operations shape an already-resampled signal. A chain must never go back
/// from `Spectral` to `Timing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Timing,
    Spectral,
}

impl OperationSpec {
    pub fn stage(&self) -> Stage {
        match self {
            Self::RateShift { .. } | Self::Resample { .. } | Self::TempoCorrect { .. } => {
                Stage::Timing
            }
            Self::Equalize { .. }
            | Self::Compress { .. }
            | Self::Echo { .. }
            | Self::LowPass { .. } => Stage::Spectral,
        }
    }

    /// Short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RateShift { .. } => "rate_shift",
            Self::Resample { .. } => "resample",
            Self::TempoCorrect { .. } => "tempo_correct",
            Self::Equalize { .. } => "equalize",
            Self::Compress { .. } => "compress",
            Self::Echo { .. } => "echo",
            Self::LowPass { .. } => "low_pass",
        }
    }
}

/// Ordered, immutable list of operations owned by the catalog.
pub type OperationChain = &'static [OperationSpec];
