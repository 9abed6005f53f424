//! Voice Effects
//!
//! The effect catalog and the compiler that turns an effect's operation chain
//! into an ffmpeg filter graph.

mod catalog;
mod filter_chain;
mod operation;

pub use catalog::{CHAIN_SAMPLE_RATE, CatalogError, EffectCatalog, EffectDefinition, EffectId};
pub use filter_chain::{BuildError, FilterChainBuilder, FilterGraph};
pub use operation::{OperationChain, OperationSpec, Stage};
