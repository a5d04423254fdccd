//! Simulated source configuration types.

use serde::{Deserialize, Serialize};

fn default_sample_count() -> usize {
    200
}

fn default_interval() -> u64 {
    1000
}

fn default_seed() -> u64 {
    42
}

/// Simulated source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedSourceConfig {
    /// Length of the precomputed sample buffer
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    /// Emission cadence in milliseconds
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
    /// Noise seed; the same seed always yields the same buffer
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SimulatedSourceConfig {
    fn default() -> Self {
        Self {
            sample_count: default_sample_count(),
            interval_ms: default_interval(),
            seed: default_seed(),
        }
    }
}
