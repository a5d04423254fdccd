//! Source selection
//!
//! Exactly one source feeds the pipeline per process. The choice is made
//! once from configuration; after that every source looks the same to the
//! caller.

use crate::remote::PolledRemoteSource;
use crate::serial::LiveSerialSource;
use crate::simulated::SimulatedSource;
use log::info;
use std::time::Duration;
use tidewatch_core::{Record, RecordSource, Result, SourceMetadata, TelemetryError};
use tidewatch_types::{SourceConfig, SourceKind};

/// The active producer of records
pub enum ActiveSource {
    Serial(LiveSerialSource),
    Remote(PolledRemoteSource),
    Simulated(SimulatedSource),
}

impl ActiveSource {
    /// Build the configured source. Nothing is opened until the first pull.
    pub fn from_config(config: &SourceConfig, reconnect_delay: Duration) -> Result<Self> {
        let source = match config {
            SourceConfig::Serial(serial) => {
                ActiveSource::Serial(LiveSerialSource::new(serial.clone(), reconnect_delay))
            }
            SourceConfig::Remote(remote) => {
                if remote.principal_url.trim().is_empty()
                    || remote.supplementary_url.trim().is_empty()
                {
                    return Err(TelemetryError::Config(
                        "remote source needs both principal_url and supplementary_url".to_string(),
                    ));
                }
                ActiveSource::Remote(PolledRemoteSource::new(remote.clone()))
            }
            SourceConfig::Simulated(simulated) => {
                ActiveSource::Simulated(SimulatedSource::new(simulated))
            }
        };

        info!(
            "Selected {} source: {}",
            source.kind(),
            source.metadata().description
        );
        Ok(source)
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            ActiveSource::Serial(_) => SourceKind::Serial,
            ActiveSource::Remote(_) => SourceKind::Remote,
            ActiveSource::Simulated(_) => SourceKind::Simulated,
        }
    }
}

impl From<LiveSerialSource> for ActiveSource {
    fn from(source: LiveSerialSource) -> Self {
        ActiveSource::Serial(source)
    }
}

impl From<PolledRemoteSource> for ActiveSource {
    fn from(source: PolledRemoteSource) -> Self {
        ActiveSource::Remote(source)
    }
}

impl From<SimulatedSource> for ActiveSource {
    fn from(source: SimulatedSource) -> Self {
        ActiveSource::Simulated(source)
    }
}

impl RecordSource for ActiveSource {
    fn metadata(&self) -> &SourceMetadata {
        match self {
            ActiveSource::Serial(source) => source.metadata(),
            ActiveSource::Remote(source) => source.metadata(),
            ActiveSource::Simulated(source) => source.metadata(),
        }
    }

    async fn next_record(&mut self) -> Result<Record> {
        match self {
            ActiveSource::Serial(source) => source.next_record().await,
            ActiveSource::Remote(source) => source.next_record().await,
            ActiveSource::Simulated(source) => source.next_record().await,
        }
    }
}
