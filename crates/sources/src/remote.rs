//! Polled remote source
//!
//! Fetches a principal and a supplementary JSON feed once per poll interval
//! and merges them into a single record, supplementary keys winning.
//! A cycle where either request fails or the pair exceeds the request
//! timeout yields a [`TelemetryError::PollFailure`] and no record; the next
//! cycle proceeds on schedule.

use anyhow::{anyhow, Result as AnyResult};
use log::trace;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tidewatch_core::{Record, RecordSource, Result, SourceMetadata, TelemetryError};
use tidewatch_types::{RawFields, RemoteSourceConfig};
use tokio::time::{self, Interval, MissedTickBehavior};

/// Blocking JSON getter, one call per feed per cycle
pub trait JsonFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> AnyResult<Value>;
}

/// HTTP fetcher backed by a shared `ureq` agent
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl JsonFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> AnyResult<Value> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| anyhow!("GET {} failed: {}", url, e))?;
        Ok(response.into_json()?)
    }
}

pub struct PolledRemoteSource {
    metadata: SourceMetadata,
    config: RemoteSourceConfig,
    fetcher: Arc<dyn JsonFetcher>,
    interval: Option<Interval>,
    failed_polls: u64,
}

impl PolledRemoteSource {
    pub fn new(config: RemoteSourceConfig) -> Self {
        let fetcher = HttpFetcher::new(Duration::from_millis(config.request_timeout_ms));
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    pub fn with_fetcher(config: RemoteSourceConfig, fetcher: Arc<dyn JsonFetcher>) -> Self {
        let metadata = SourceMetadata {
            id: "remote".to_string(),
            name: "Polled Remote".to_string(),
            description: format!(
                "Merged feeds {} + {}",
                config.principal_url, config.supplementary_url
            ),
            nominal_interval: Some(poll_interval(&config)),
        };

        Self {
            metadata,
            config,
            fetcher,
            interval: None,
            failed_polls: 0,
        }
    }

    /// Poll cycles that produced no record
    pub fn failed_polls(&self) -> u64 {
        self.failed_polls
    }

    /// Fetch both feeds concurrently and merge them
    pub async fn poll_once(&self) -> Result<Record> {
        let timeout = Duration::from_millis(self.config.request_timeout_ms.max(1));
        let principal = fetch_fields(Arc::clone(&self.fetcher), self.config.principal_url.clone());
        let supplementary =
            fetch_fields(Arc::clone(&self.fetcher), self.config.supplementary_url.clone());

        let (principal, supplementary) =
            match time::timeout(timeout, async { tokio::try_join!(principal, supplementary) }).await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(TelemetryError::PollFailure(format!(
                        "timed out after {:?}",
                        timeout
                    )))
                }
            };

        Ok(Record::from_raw(principal.merge(supplementary)))
    }
}

fn poll_interval(config: &RemoteSourceConfig) -> Duration {
    Duration::from_millis(config.poll_interval_ms.max(1))
}

async fn fetch_fields(fetcher: Arc<dyn JsonFetcher>, url: String) -> Result<RawFields> {
    let target = url.clone();
    let value = tokio::task::spawn_blocking(move || fetcher.fetch(&target))
        .await
        .map_err(|e| TelemetryError::PollFailure(format!("fetch task failed: {}", e)))?
        .map_err(|e| TelemetryError::PollFailure(format!("{:#}", e)))?;

    if !value.is_object() {
        return Err(TelemetryError::PollFailure(format!(
            "{} did not return a JSON object",
            url
        )));
    }

    trace!("Fetched {}", url);
    RawFields::from_json(value)
        .map_err(|e| TelemetryError::PollFailure(format!("{}: {}", url, e)))
}

impl RecordSource for PolledRemoteSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    async fn next_record(&mut self) -> Result<Record> {
        let period = poll_interval(&self.config);
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        interval.tick().await;

        let result = self.poll_once().await;
        if result.is_err() {
            self.failed_polls += 1;
        }
        result
    }
}
