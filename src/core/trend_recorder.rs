//! Trend recorder - the hub subscriber that feeds the rolling windows
//!
//! The recorder is the only writer of its [`TrendSet`]. Readers take owned
//! snapshots, so a consumer rendering a chart never holds the lock while the
//! next record arrives.

use anyhow::Result;
use log::warn;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tidewatch_core::{AnalyticsSummary, Record, Subscriber, TrackedField, TrendSet, WindowSnapshot};

pub struct TrendRecorder {
    trends: Mutex<TrendSet>,
}

impl TrendRecorder {
    pub fn new(window_capacity: usize) -> Self {
        Self {
            trends: Mutex::new(TrendSet::new(window_capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrendSet> {
        self.trends.lock().unwrap_or_else(|poisoned| {
            warn!("Trend lock poisoned, continuing with last state");
            poisoned.into_inner()
        })
    }

    /// Owned copy of every window
    pub fn snapshot(&self) -> BTreeMap<TrackedField, WindowSnapshot> {
        self.lock().snapshot()
    }

    pub fn window(&self, field: TrackedField) -> Option<WindowSnapshot> {
        self.lock().window(field).map(|window| window.snapshot())
    }

    pub fn analytics(&self) -> AnalyticsSummary {
        AnalyticsSummary::from_trends(&self.lock())
    }

    /// Records currently held per window
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Subscriber for TrendRecorder {
    fn name(&self) -> &str {
        "trend-recorder"
    }

    fn deliver(&self, record: &Arc<Record>) -> Result<()> {
        self.lock().record(record);
        Ok(())
    }
}
