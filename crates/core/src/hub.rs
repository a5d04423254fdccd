//! Broadcast hub - fans records out from the active source to every subscriber
//!
//! The registered set is kept as an immutable snapshot behind an `ArcSwap`.
//! Joining or leaving swaps in a new snapshot, while a publish in progress
//! keeps iterating the snapshot it loaded. A concurrent membership change can
//! therefore never corrupt or skip delivery mid-broadcast.
//!
//! Delivery is fire-and-forget. The hub keeps no record after `publish`
//! returns and never waits on a subscriber; a sink that cannot keep up must
//! drop intermediate records on its own side.

use crate::error::TelemetryError;
use anyhow::Result;
use arc_swap::ArcSwap;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tidewatch_types::Record;
use uuid::Uuid;

/// Opaque handle identifying one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Anything that can receive a record.
///
/// `deliver` runs on the producer's path, so it must not block: hand the
/// record off (e.g. to a channel or a latest-value slot) and return.
pub trait Subscriber: Send + Sync {
    /// Short label used in log lines
    fn name(&self) -> &str {
        "subscriber"
    }

    fn deliver(&self, record: &Arc<Record>) -> Result<()>;
}

impl<F> Subscriber for F
where
    F: Fn(&Arc<Record>) -> Result<()> + Send + Sync,
{
    fn deliver(&self, record: &Arc<Record>) -> Result<()> {
        self(record)
    }
}

struct Registration {
    id: SubscriberId,
    sink: Arc<dyn Subscriber>,
}

/// Outcome of a single publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

/// In-process fan-out point from one producer to many subscribers
pub struct BroadcastHub {
    subscribers: ArcSwap<Vec<Arc<Registration>>>,
    published: AtomicU64,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            subscribers: ArcSwap::from_pointee(Vec::new()),
            published: AtomicU64::new(0),
        }
    }

    /// Register a sink; it receives every record published from now on
    pub fn subscribe(&self, sink: Arc<dyn Subscriber>) -> SubscriberId {
        let registration = Arc::new(Registration {
            id: SubscriberId::new(),
            sink,
        });
        let id = registration.id;
        let name = registration.sink.name().to_string();

        self.subscribers.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&registration));
            next
        });

        debug!(
            "Subscriber {} ({}) joined, {} registered",
            id,
            name,
            self.subscriber_count()
        );
        id
    }

    /// Remove a registration. Returns false if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let previous = self.subscribers.rcu(|current| {
            current
                .iter()
                .filter(|registration| registration.id != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        let removed = previous.iter().any(|registration| registration.id == id);

        if removed {
            debug!(
                "Subscriber {} left, {} registered",
                id,
                self.subscriber_count()
            );
        }
        removed
    }

    /// Deliver a record to every currently registered subscriber.
    ///
    /// Each sink is invoked exactly once. A sink that returns an error or
    /// panics is logged and skipped; the remaining sinks still receive the
    /// record and nothing propagates back to the producer.
    pub fn publish(&self, record: Record) -> PublishReport {
        let record = Arc::new(record);
        let snapshot = self.subscribers.load_full();
        let mut report = PublishReport::default();

        for registration in snapshot.iter() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                registration.sink.deliver(&record)
            }));

            let reason = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(e)) => format!("{:#}", e),
                Err(payload) => panic_message(payload.as_ref()),
            };

            report.failed += 1;
            let failure = TelemetryError::SubscriberFailure {
                id: registration.id,
                reason,
            };
            warn!("{} ({})", failure, registration.sink.name());
        }

        let total = self.published.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(
            "Published record #{} at {} to {} subscribers ({} failed)",
            total,
            record.timestamp,
            snapshot.len(),
            report.failed
        );
        report
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load().len()
    }

    /// Number of records published since creation
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
