//! Filter Chain Builder
//!
//! Compiles an operation chain into an ffmpeg `-af` filter graph.

use super::catalog::CHAIN_SAMPLE_RATE;
use super::operation::{OperationSpec, Stage};
use std::fmt;
use thiserror::Error;

/// Single-pass `atempo` range.
const TEMPO_RANGE: std::ops::RangeInclusive<f64> = 0.5..=2.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("Operation chain is empty")]
    EmptyChain,

    #[error("Operation {op} at position {index} follows a spectral operation")]
    OutOfOrder { op: &'static str, index: usize },

    #[error("Invalid parameter for {op}: {reason}")]
    InvalidParameter { op: &'static str, reason: String },
}

/// A compiled filter graph, ready to pass to `-af`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGraph(String);

impl FilterGraph {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serializes operation chains into ffmpeg filter syntax.
///
/// An empty chain is always an error. A pass-through encode is expressed by
/// invoking the engine without a filter graph, not by building one.
#[derive(Debug, Clone, Copy)]
pub struct FilterChainBuilder {
    /// Rate that `asetrate` multiplies; must match the decoded input rate
    base_rate: u32,
}

impl Default for FilterChainBuilder {
    fn default() -> Self {
        Self::new(CHAIN_SAMPLE_RATE)
    }
}

impl FilterChainBuilder {
    pub fn new(base_rate: u32) -> Self {
        Self { base_rate }
    }

    pub fn build(&self, chain: &[OperationSpec]) -> Result<FilterGraph, BuildError> {
        if chain.is_empty() {
            return Err(BuildError::EmptyChain);
        }

        let mut stage = Stage::Timing;
        let mut parts = Vec::with_capacity(chain.len());

        for (index, op) in chain.iter().enumerate() {
            if op.stage() < stage {
                return Err(BuildError::OutOfOrder {
                    op: op.name(),
                    index,
                });
            }
            stage = op.stage();
            parts.push(self.render(op)?);
        }

        Ok(FilterGraph(parts.join(",")))
    }

    fn render(&self, op: &OperationSpec) -> Result<String, BuildError> {
        let rendered = match *op {
            OperationSpec::RateShift { factor } => {
                positive(op, "factor", factor)?;
                format!("asetrate={}*{}", self.base_rate, factor)
            }
            OperationSpec::Resample { target_rate } => {
                if target_rate == 0 {
                    return Err(invalid(op, "target_rate must be non-zero".to_string()));
                }
                format!("aresample={}", target_rate)
            }
            OperationSpec::TempoCorrect { factor } => {
                if !TEMPO_RANGE.contains(&factor) {
                    return Err(invalid(
                        op,
                        format!("factor {} outside {:?}", factor, TEMPO_RANGE),
                    ));
                }
                format!("atempo={}", factor)
            }
            OperationSpec::Equalize {
                center_hz,
                bandwidth_hz,
                gain_db,
            } => {
                positive(op, "center_hz", center_hz)?;
                positive(op, "bandwidth_hz", bandwidth_hz)?;
                finite(op, "gain_db", gain_db)?;
                format!("equalizer=f={}:t=h:w={}:g={}", center_hz, bandwidth_hz, gain_db)
            }
            OperationSpec::Compress {
                threshold_db,
                ratio,
                attack_ms,
                release_ms,
            } => {
                finite(op, "threshold_db", threshold_db)?;
                if !(ratio >= 1.0 && ratio.is_finite()) {
                    return Err(invalid(op, format!("ratio {} must be >= 1", ratio)));
                }
                positive(op, "attack_ms", attack_ms)?;
                positive(op, "release_ms", release_ms)?;
                format!(
                    "acompressor=threshold={}dB:ratio={}:attack={}:release={}",
                    threshold_db, ratio, attack_ms, release_ms
                )
            }
            OperationSpec::Echo {
                in_gain,
                out_gain,
                delay_ms,
                decay,
            } => {
                positive(op, "in_gain", in_gain)?;
                positive(op, "out_gain", out_gain)?;
                positive(op, "delay_ms", delay_ms)?;
                positive(op, "decay", decay)?;
                format!("aecho={}:{}:{}:{}", in_gain, out_gain, delay_ms, decay)
            }
            OperationSpec::LowPass { cutoff_hz } => {
                positive(op, "cutoff_hz", cutoff_hz)?;
                format!("lowpass=f={}", cutoff_hz)
            }
        };
        Ok(rendered)
    }
}

fn invalid(op: &OperationSpec, reason: String) -> BuildError {
    BuildError::InvalidParameter {
        op: op.name(),
        reason,
    }
}

fn positive(op: &OperationSpec, field: &str, value: f64) -> Result<(), BuildError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(op, format!("{} must be positive, got {}", field, value)))
    }
}

fn finite(op: &OperationSpec, field: &str, value: f64) -> Result<(), BuildError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(op, format!("{} must be finite", field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{EffectCatalog, EffectId};

    #[test]
    fn test_build_male_to_female() {
        let def = EffectCatalog::global().get(EffectId::MaleToFemale);
        let graph = FilterChainBuilder::default().build(def.chain).unwrap();
        assert_eq!(
            graph.as_str(),
            "asetrate=44100*1.32,aresample=44100,atempo=1.02,\
             equalizer=f=300:t=h:w=200:g=3,equalizer=f=3000:t=h:w=200:g=4"
        );
    }

    #[test]
    fn test_build_female_warm_compressor() {
        let def = EffectCatalog::global().get(EffectId::FemaleWarm);
        let graph = FilterChainBuilder::default().build(def.chain).unwrap();
        assert!(graph
            .as_str()
            .ends_with("acompressor=threshold=-22dB:ratio=2.5:attack=15:release=180"));
    }

    #[test]
    fn test_build_preserves_order() {
        let chain = [
            OperationSpec::RateShift { factor: 1.5 },
            OperationSpec::LowPass { cutoff_hz: 8000.0 },
            OperationSpec::Echo {
                in_gain: 0.8,
                out_gain: 0.9,
                delay_ms: 60.0,
                decay: 0.3,
            },
        ];
        let graph = FilterChainBuilder::new(48_000).build(&chain).unwrap();
        assert_eq!(
            graph.to_string(),
            "asetrate=48000*1.5,lowpass=f=8000,aecho=0.8:0.9:60:0.3"
        );
    }

    #[test]
    fn test_every_catalog_effect_builds() {
        let builder = FilterChainBuilder::default();
        for def in EffectCatalog::global().iter() {
            let graph = builder.build(def.chain).unwrap();
            assert_eq!(graph.as_str().split(',').count(), def.chain.len());
        }
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        let err = FilterChainBuilder::default().build(&[]).unwrap_err();
        assert_eq!(err, BuildError::EmptyChain);
    }

    #[test]
    fn test_timing_after_spectral_is_rejected() {
        let chain = [
            OperationSpec::LowPass { cutoff_hz: 4000.0 },
            OperationSpec::TempoCorrect { factor: 1.1 },
        ];
        let err = FilterChainBuilder::default().build(&chain).unwrap_err();
        assert_eq!(
            err,
            BuildError::OutOfOrder {
                op: "tempo_correct",
                index: 1
            }
        );
    }

    #[test]
    fn test_tempo_out_of_range_is_rejected() {
        let chain = [OperationSpec::TempoCorrect { factor: 3.0 }];
        let err = FilterChainBuilder::default().build(&chain).unwrap_err();
        assert!(matches!(err, BuildError::InvalidParameter { op: "tempo_correct", .. }));
    }

    #[test]
    fn test_non_positive_rate_is_rejected() {
        let chain = [OperationSpec::RateShift { factor: 0.0 }];
        assert!(FilterChainBuilder::default().build(&chain).is_err());

        let chain = [OperationSpec::Resample { target_rate: 0 }];
        assert!(FilterChainBuilder::default().build(&chain).is_err());
    }

    #[test]
    fn test_compressor_ratio_below_one_is_rejected() {
        let chain = [OperationSpec::Compress {
            threshold_db: -20.0,
            ratio: 0.5,
            attack_ms: 20.0,
            release_ms: 200.0,
        }];
        let err = FilterChainBuilder::default().build(&chain).unwrap_err();
        assert!(err.to_string().contains("ratio"));
    }
}
