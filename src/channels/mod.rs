//! Channel Integrations
//!
//! Chat front-ends that feed selections into the request coordinator.

#[cfg(feature = "telegram")]
pub mod telegram;
