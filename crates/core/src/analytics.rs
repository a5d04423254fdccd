//! Summary statistics over the current trend windows

use crate::rolling_window::TrendSet;
use serde::Serialize;
use tidewatch_types::TrackedField;

/// Aggregates shown on the analytics view.
///
/// Averages and extrema are `None` until at least one record has been folded
/// into the trend windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    /// Records currently inside the windows
    pub samples: usize,
    /// Records seen since startup
    pub total_records: u64,
    pub avg_ph: Option<f64>,
    pub avg_salinity: Option<f64>,
    pub min_pressure: Option<f64>,
    pub max_pressure: Option<f64>,
    /// Records within the windows that reported a leak
    pub leak_events: usize,
}

impl AnalyticsSummary {
    pub fn from_trends(trends: &TrendSet) -> Self {
        let pressure = trends.window(TrackedField::Pressure);
        Self {
            samples: trends.len(),
            total_records: trends.records_seen(),
            avg_ph: trends.window(TrackedField::Ph).and_then(|w| w.mean()),
            avg_salinity: trends.window(TrackedField::Salinity).and_then(|w| w.mean()),
            min_pressure: pressure.and_then(|w| w.min()),
            max_pressure: pressure.and_then(|w| w.max()),
            leak_events: trends.leak_events(),
        }
    }
}
