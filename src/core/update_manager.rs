//! Update manager - pulls records from the active source into the hub

use log::{error, info, trace, warn};
use std::sync::Arc;
use tidewatch_core::{BroadcastHub, RecordSource, TelemetryError};
use tokio::sync::watch;
use tokio::time::Instant;

/// Counters for one run of the update loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub published: u64,
    pub source_errors: u64,
}

/// Drives exactly one source, publishing every record in arrival order
pub struct UpdateManager {
    hub: Arc<BroadcastHub>,
}

impl UpdateManager {
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self { hub }
    }

    /// Run the update loop until `shutdown` flips to true or its sender is dropped.
    ///
    /// Source errors are logged and the loop keeps pulling; the source owns
    /// its own recovery. The source is dropped on return, releasing its
    /// transport and timers.
    pub async fn run<S: RecordSource>(
        &self,
        mut source: S,
        mut shutdown: watch::Receiver<bool>,
    ) -> UpdateStats {
        let mut stats = UpdateStats::default();
        info!(
            "Starting update loop for {} ({} fields per record)",
            source.metadata().name,
            source.fields().len()
        );

        while !*shutdown.borrow() {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                result = source.next_record() => match result {
                    Ok(record) => {
                        let start = Instant::now();
                        let report = self.hub.publish(record);
                        stats.published += 1;
                        trace!(
                            "Delivered to {} subscribers in {:?}",
                            report.delivered,
                            start.elapsed()
                        );
                    }
                    Err(e) => {
                        stats.source_errors += 1;
                        match e {
                            TelemetryError::SourceLost(_) | TelemetryError::PollFailure(_) => {
                                warn!("{}", e)
                            }
                            TelemetryError::MalformedLine { .. } => trace!("{}", e),
                            _ => error!("Source error: {}", e),
                        }
                    }
                },
            }
        }

        info!(
            "Update loop stopped after {} records ({} source errors)",
            stats.published, stats.source_errors
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tidewatch_core::{Record, Result, SourceMetadata};

    /// Replays a script of outcomes, then idles
    struct ScriptedSource {
        metadata: SourceMetadata,
        script: Vec<Result<Record>>,
    }

    impl ScriptedSource {
        fn new(mut script: Vec<Result<Record>>) -> Self {
            script.reverse();
            Self {
                metadata: SourceMetadata {
                    id: "scripted".to_string(),
                    name: "Scripted".to_string(),
                    description: String::new(),
                    nominal_interval: None,
                },
                script,
            }
        }
    }

    impl RecordSource for ScriptedSource {
        fn metadata(&self) -> &SourceMetadata {
            &self.metadata
        }

        async fn next_record(&mut self) -> Result<Record> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            match self.script.pop() {
                Some(outcome) => outcome,
                None => std::future::pending().await,
            }
        }
    }

    fn record(ts: &str) -> Record {
        Record {
            timestamp: ts.to_string(),
            ..Record::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_in_order_and_survives_errors() {
        let hub = Arc::new(BroadcastHub::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        hub.subscribe(Arc::new(move |record: &Arc<Record>| -> anyhow::Result<()> {
            sink.lock().unwrap().push(record.timestamp.clone());
            Ok(())
        }));

        let source = ScriptedSource::new(vec![
            Ok(record("00:00:01")),
            Err(TelemetryError::PollFailure("timed out".into())),
            Ok(record("00:00:02")),
            Err(TelemetryError::SourceLost("unplugged".into())),
            Ok(record("00:00:03")),
        ]);

        let (tx, rx) = watch::channel(false);
        let manager = UpdateManager::new(Arc::clone(&hub));
        let run = tokio::spawn(async move { manager.run(source, rx).await });

        tokio::time::sleep(Duration::from_millis(200)).await;
        tx.send(true).unwrap();
        let stats = run.await.unwrap();

        assert_eq!(stats, UpdateStats { published: 3, source_errors: 2 });
        assert_eq!(*seen.lock().unwrap(), vec!["00:00:01", "00:00:02", "00:00:03"]);
    }

    #[tokio::test]
    async fn test_stops_when_shutdown_sender_dropped() {
        let hub = Arc::new(BroadcastHub::new());
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let stats = UpdateManager::new(hub)
            .run(ScriptedSource::new(Vec::new()), rx)
            .await;
        assert_eq!(stats, UpdateStats::default());
    }
}
