//! Error types for the coalescence layer.

use thiserror::Error;

/// Discovery failures.
///
/// Discovery is an external collaborator; its failure modes collapse to
/// one unavailable variant here.
#[derive(Debug, Error, Clone)]
pub enum DiscoveryError {
    /// The discovery backend could not produce a peer list
    #[error("discovery unavailable: {0}")]
    Unavailable(String),
}

/// Coalescence engine failures surfaced to callers.
///
/// Per-peer fetch failures are absorbed by the fan-out and never appear
/// here; only a failed discovery fails an initialization.
#[derive(Debug, Error)]
pub enum CoalesceError {
    /// Discovery itself failed, so no peers are known
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
}
