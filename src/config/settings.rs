//! Application configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tidewatch_core::{DEFAULT_RECONNECT_DELAY, DEFAULT_WINDOW_CAPACITY};
use tidewatch_types::{
    RemoteSourceConfig, SerialSourceConfig, SimulatedSourceConfig, SourceConfig, SourceKind,
};

fn default_reconnect_delay() -> u64 {
    DEFAULT_RECONNECT_DELAY.as_millis() as u64
}

fn default_window_capacity() -> usize {
    DEFAULT_WINDOW_CAPACITY
}

/// Application-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the config format
    #[serde(default = "default_version")]
    pub version: u32,
    /// Which source feeds the pipeline
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default)]
    pub serial: SerialSourceConfig,
    #[serde(default)]
    pub remote: RemoteSourceConfig,
    #[serde(default)]
    pub simulated: SimulatedSourceConfig,
    /// Delay before reopening a lost serial link
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Values kept per trend window
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    #[serde(default)]
    pub publisher: PublisherConfig,
}

fn default_version() -> u32 {
    1
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "github.tidewatch", "tidewatch")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.json"))
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Configuration of the selected source
    pub fn source_config(&self) -> SourceConfig {
        match self.source {
            SourceKind::Serial => SourceConfig::Serial(self.serial.clone()),
            SourceKind::Remote => SourceConfig::Remote(self.remote.clone()),
            SourceKind::Simulated => SourceConfig::Simulated(self.simulated.clone()),
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            source: SourceKind::default(),
            serial: SerialSourceConfig::default(),
            remote: RemoteSourceConfig::default(),
            simulated: SimulatedSourceConfig::default(),
            reconnect_delay_ms: default_reconnect_delay(),
            window_capacity: default_window_capacity(),
            publisher: PublisherConfig::default(),
        }
    }
}

fn default_publisher_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

/// Network fan-out of records to external viewers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    #[serde(default = "default_publisher_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            enabled: default_publisher_enabled(),
            bind_address: default_bind_address(),
        }
    }
}
