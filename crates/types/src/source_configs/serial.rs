//! Serial source configuration types.

use serde::{Deserialize, Serialize};

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_timeout() -> u64 {
    200
}

/// Serial source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialSourceConfig {
    /// Port path (e.g. "/dev/ttyACM0" or "COM3"). `None` auto-detects.
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Read timeout; bounds how long the reader takes to notice shutdown
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

impl Default for SerialSourceConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}
