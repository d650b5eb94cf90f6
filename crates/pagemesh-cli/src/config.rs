//! Configuration system for the Pagemesh CLI.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which cache-presence summary the engine coalesces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Exact-membership digest lists
    Digest,
    /// Probabilistic bloom filters
    Bloom,
}

/// Pagemesh configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Transfer tuning
    #[serde(default)]
    pub transfer: TransferConfig,
    /// Mesh behavior
    #[serde(default)]
    pub mesh: MeshConfig,
}

/// Transfer tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Chunk size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Push variant: buffered-byte level that suspends the sender
    #[serde(default = "default_full_threshold")]
    pub full_threshold: usize,
    /// Push variant: buffered-byte level that resumes the sender
    #[serde(default = "default_low_threshold")]
    pub low_threshold: usize,
}

/// Mesh behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Service name peers advertise
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Default coalescence strategy
    #[serde(default = "default_strategy")]
    pub strategy: StrategyKind,
}

fn default_chunk_size() -> usize {
    16 * 1024
}

fn default_full_threshold() -> usize {
    256 * 1024
}

fn default_low_threshold() -> usize {
    64 * 1024
}

fn default_service_name() -> String {
    "pagemesh".to_string()
}

fn default_strategy() -> StrategyKind {
    StrategyKind::Digest
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            full_threshold: default_full_threshold(),
            low_threshold: default_low_threshold(),
        }
    }
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            strategy: default_strategy(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load from a file if it exists, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate field combinations
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.transfer.chunk_size == 0 {
            anyhow::bail!("transfer.chunk_size must be positive");
        }
        if self.transfer.low_threshold == 0
            || self.transfer.low_threshold >= self.transfer.full_threshold
        {
            anyhow::bail!("transfer thresholds must satisfy 0 < low < full");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.mesh.strategy, StrategyKind::Digest);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [transfer]
            chunk_size = 512

            [mesh]
            strategy = "bloom"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.transfer.chunk_size, 512);
        assert_eq!(parsed.transfer.low_threshold, 64 * 1024);
        assert_eq!(parsed.mesh.strategy, StrategyKind::Bloom);
        assert_eq!(parsed.mesh.service_name, "pagemesh");
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let config = Config {
            transfer: TransferConfig {
                chunk_size: 1024,
                full_threshold: 100,
                low_threshold: 100,
            },
            mesh: MeshConfig::default(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagemesh.toml");
        std::fs::write(&path, "[mesh]\nservice_name = \"office-mesh\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.mesh.service_name, "office-mesh");
    }
}
