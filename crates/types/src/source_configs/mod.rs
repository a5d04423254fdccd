//! Source configuration types for all telemetry sources.

pub mod remote;
pub mod serial;
pub mod simulated;

use serde::{Deserialize, Serialize};

pub use remote::RemoteSourceConfig;
pub use serial::SerialSourceConfig;
pub use simulated::SimulatedSourceConfig;

/// Which producer feeds the pipeline. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Line-oriented stream from a serial-attached sensor unit
    Serial,
    /// Two HTTP feeds polled on a fixed interval
    Remote,
    /// Replayed synthetic samples
    #[default]
    Simulated,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Serial => "serial",
            SourceKind::Remote => "remote",
            SourceKind::Simulated => "simulated",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" | "live" => Ok(SourceKind::Serial),
            "remote" | "polled" => Ok(SourceKind::Remote),
            "simulated" | "sim" => Ok(SourceKind::Simulated),
            other => Err(format!(
                "unknown source '{}', expected serial, remote or simulated",
                other
            )),
        }
    }
}

/// Type-safe configuration for the selected source.
/// Uses serde tag for JSON serialization: {"source_type": "serial", ...}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_type")]
pub enum SourceConfig {
    #[serde(rename = "serial")]
    Serial(SerialSourceConfig),

    #[serde(rename = "remote")]
    Remote(RemoteSourceConfig),

    #[serde(rename = "simulated")]
    Simulated(SimulatedSourceConfig),
}

impl SourceConfig {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceConfig::Serial(_) => SourceKind::Serial,
            SourceConfig::Remote(_) => SourceKind::Remote,
            SourceConfig::Simulated(_) => SourceKind::Simulated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_serialization() {
        let config = SourceConfig::Serial(SerialSourceConfig::default());
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"source_type\":\"serial\""));

        let deserialized: SourceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.kind(), SourceKind::Serial);
    }

    #[test]
    fn test_source_kind_parsing() {
        assert_eq!("Serial".parse::<SourceKind>(), Ok(SourceKind::Serial));
        assert_eq!("sim".parse::<SourceKind>(), Ok(SourceKind::Simulated));
        assert!("carrier-pigeon".parse::<SourceKind>().is_err());
    }
}
