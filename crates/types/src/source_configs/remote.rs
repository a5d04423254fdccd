//! Polled remote source configuration types.

use serde::{Deserialize, Serialize};

fn default_poll_interval() -> u64 {
    2000
}

fn default_request_timeout() -> u64 {
    5000
}

/// Remote source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSourceConfig {
    /// Principal telemetry feed
    #[serde(default)]
    pub principal_url: String,
    /// Supplementary feed; its keys win on collision
    #[serde(default)]
    pub supplementary_url: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Upper bound for one poll cycle, both requests included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for RemoteSourceConfig {
    fn default() -> Self {
        Self {
            principal_url: String::new(),
            supplementary_url: String::new(),
            poll_interval_ms: default_poll_interval(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}
