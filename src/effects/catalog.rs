//! Effect Catalog
//!
//! The fixed set of voice effects offered to users and the operation chain
//! behind each one. Tunings are constants; adding an effect means adding a
//! new `EffectId` variant and a new chain, never editing one at runtime.

use super::operation::{OperationChain, OperationSpec};
use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sample rate every chain resamples back to.
pub const CHAIN_SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Unknown effect: {0}")]
    UnknownEffect(String),
}

/// Identifier of a catalog effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectId {
    MaleToFemale,
    FemaleSoft,
    FemaleConfident,
    FemaleYoung,
    FemaleMature,
    FemaleWarm,
}

impl EffectId {
    /// All effects in menu order.
    pub const ALL: [EffectId; 6] = [
        EffectId::MaleToFemale,
        EffectId::FemaleSoft,
        EffectId::FemaleConfident,
        EffectId::FemaleYoung,
        EffectId::FemaleMature,
        EffectId::FemaleWarm,
    ];

    /// Canonical token, used as callback data and in the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaleToFemale => "male_to_female",
            Self::FemaleSoft => "female_soft",
            Self::FemaleConfident => "female_confident",
            Self::FemaleYoung => "female_young",
            Self::FemaleMature => "female_mature",
            Self::FemaleWarm => "female_warm",
        }
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "male_to_female" => Ok(Self::MaleToFemale),
            "female_soft" | "female_soft2" => Ok(Self::FemaleSoft),
            "female_confident" => Ok(Self::FemaleConfident),
            "female_young" => Ok(Self::FemaleYoung),
            "female_mature" | "female_mature2" => Ok(Self::FemaleMature),
            "female_warm" | "female_warm2" => Ok(Self::FemaleWarm),
            other => Err(CatalogError::UnknownEffect(other.to_string())),
        }
    }
}

/// A catalog entry: identity, presentation, and the operation chain.
#[derive(Debug, Clone, Copy)]
pub struct EffectDefinition {
    pub id: EffectId,
    /// Button label shown in the effect menu
    pub label: &'static str,
    pub description: &'static str,
    pub chain: OperationChain,
}

const fn eq(center_hz: f64, bandwidth_hz: f64, gain_db: f64) -> OperationSpec {
    OperationSpec::Equalize {
        center_hz,
        bandwidth_hz,
        gain_db,
    }
}

const fn timing(rate: f64, tempo: f64) -> [OperationSpec; 3] {
    [
        OperationSpec::RateShift { factor: rate },
        OperationSpec::Resample {
            target_rate: CHAIN_SAMPLE_RATE,
        },
        OperationSpec::TempoCorrect { factor: tempo },
    ]
}

// Tempo factors stay below the rate factors, so every effect except
// `female_mature` ends up slightly shorter than the source recording.

/// Pitch x1.32, tempo x1.02. Lifts low body and presence.
static MALE_TO_FEMALE: [OperationSpec; 5] = {
    let t = timing(1.32, 1.02);
    [t[0], t[1], t[2], eq(300.0, 200.0, 3.0), eq(3000.0, 200.0, 4.0)]
};

/// Pitch x1.18, tempo x1.04. Gentle air band and light compression.
static FEMALE_SOFT: [OperationSpec; 6] = {
    let t = timing(1.18, 1.04);
    [
        t[0],
        t[1],
        t[2],
        eq(250.0, 200.0, 4.0),
        eq(4500.0, 1000.0, 3.0),
        OperationSpec::Compress {
            threshold_db: -20.0,
            ratio: 3.0,
            attack_ms: 20.0,
            release_ms: 200.0,
        },
    ]
};

/// Pitch x1.10, tempo x1.02. Radio-style presence with firm compression.
static FEMALE_CONFIDENT: [OperationSpec; 6] = {
    let t = timing(1.10, 1.02);
    [
        t[0],
        t[1],
        t[2],
        eq(180.0, 200.0, 5.0),
        eq(3500.0, 800.0, 6.0),
        OperationSpec::Compress {
            threshold_db: -18.0,
            ratio: 4.0,
            attack_ms: 10.0,
            release_ms: 250.0,
        },
    ]
};

/// Pitch x1.40, tempo x1.07. The brightest preset.
static FEMALE_YOUNG: [OperationSpec; 5] = {
    let t = timing(1.40, 1.07);
    [t[0], t[1], t[2], eq(500.0, 300.0, 5.0), eq(6000.0, 2000.0, 7.0)]
};

/// Pitch x1.05, tempo unchanged. Three shallow bands.
static FEMALE_MATURE: [OperationSpec; 6] = {
    let t = timing(1.05, 1.00);
    [
        t[0],
        t[1],
        t[2],
        eq(250.0, 200.0, 3.0),
        eq(2000.0, 500.0, 2.0),
        eq(8000.0, 1000.0, 3.0),
    ]
};

/// Pitch x1.15, tempo x1.03. Warm mids with soft compression.
static FEMALE_WARM: [OperationSpec; 6] = {
    let t = timing(1.15, 1.03);
    [
        t[0],
        t[1],
        t[2],
        eq(300.0, 250.0, 4.0),
        eq(4000.0, 900.0, 5.0),
        OperationSpec::Compress {
            threshold_db: -22.0,
            ratio: 2.5,
            attack_ms: 15.0,
            release_ms: 180.0,
        },
    ]
};

fn definition(id: EffectId) -> EffectDefinition {
    let (label, description, chain): (&str, &str, OperationChain) = match id {
        EffectId::MaleToFemale => (
            "👩 Male → Female",
            "Natural male to female conversion",
            &MALE_TO_FEMALE,
        ),
        EffectId::FemaleSoft => (
            "🌸 Soft Woman",
            "Gentle, smooth and feminine",
            &FEMALE_SOFT,
        ),
        EffectId::FemaleConfident => (
            "💼 Confident Woman",
            "Strong, bold radio voice",
            &FEMALE_CONFIDENT,
        ),
        EffectId::FemaleYoung => (
            "✨ Young Girl",
            "Bright, higher pitched and energetic",
            &FEMALE_YOUNG,
        ),
        EffectId::FemaleMature => (
            "🍷 Mature Woman",
            "Deep, elegant feminine tone",
            &FEMALE_MATURE,
        ),
        EffectId::FemaleWarm => (
            "☕ Warm Lady",
            "Emotional, smooth and warm",
            &FEMALE_WARM,
        ),
    };

    EffectDefinition {
        id,
        label,
        description,
        chain,
    }
}

static CATALOG: Lazy<EffectCatalog> = Lazy::new(|| EffectCatalog {
    entries: EffectId::ALL.iter().copied().map(definition).collect(),
});

/// Read-only view over the built-in effects.
#[derive(Debug)]
pub struct EffectCatalog {
    entries: Vec<EffectDefinition>,
}

impl EffectCatalog {
    /// The process-wide catalog.
    pub fn global() -> &'static EffectCatalog {
        &CATALOG
    }

    /// Resolve a user-supplied token to its effect definition.
    pub fn resolve(&self, token: &str) -> Result<&EffectDefinition, CatalogError> {
        let id = token.parse::<EffectId>()?;
        Ok(self.get(id))
    }

    /// Look up a typed id. Every id has an entry.
    pub fn get(&self, id: EffectId) -> &EffectDefinition {
        // entries is built from EffectId::ALL in order
        &self.entries[id as usize]
    }

    pub fn contains(&self, token: &str) -> bool {
        token.parse::<EffectId>().is_ok()
    }

    /// Entries in menu order.
    pub fn iter(&self) -> impl Iterator<Item = &EffectDefinition> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
