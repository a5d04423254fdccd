//! Telemetry context shared by the pump, the publisher and the views
//!
//! Built once at startup and passed explicitly to whoever needs it.

use super::TrendRecorder;
use std::sync::Arc;
use tidewatch_core::{AnalyticsSummary, BroadcastHub, SubscriberId};
use tidewatch_types::SourceKind;

pub struct TelemetryContext {
    source_kind: SourceKind,
    hub: Arc<BroadcastHub>,
    trends: Arc<TrendRecorder>,
    trend_subscription: SubscriberId,
}

impl TelemetryContext {
    /// Create the hub and register the trend recorder on it
    pub fn new(source_kind: SourceKind, window_capacity: usize) -> Self {
        let hub = Arc::new(BroadcastHub::new());
        let trends = Arc::new(TrendRecorder::new(window_capacity));
        let trend_subscription = hub.subscribe(trends.clone());

        Self {
            source_kind,
            hub,
            trends,
            trend_subscription,
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    pub fn trends(&self) -> &Arc<TrendRecorder> {
        &self.trends
    }

    pub fn trend_subscription(&self) -> SubscriberId {
        self.trend_subscription
    }

    pub fn analytics(&self) -> AnalyticsSummary {
        self.trends.analytics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidewatch_core::{Record, TrackedField};

    #[test]
    fn test_published_records_reach_trends() {
        let context = TelemetryContext::new(SourceKind::Simulated, 50);
        assert_eq!(context.hub().subscriber_count(), 1);

        context.hub().publish(Record {
            salinity: 1900.0,
            ..Record::default()
        });

        let salinity = context.trends().window(TrackedField::Salinity).unwrap();
        assert_eq!(salinity.values, vec![1900.0]);
        assert_eq!(context.analytics().avg_salinity, Some(1900.0));
        assert_eq!(context.source_kind(), SourceKind::Simulated);
    }

    #[test]
    fn test_unsubscribed_trends_stop_recording() {
        let context = TelemetryContext::new(SourceKind::Serial, 50);
        context.hub().publish(Record::default());

        assert!(context.hub().unsubscribe(context.trend_subscription()));
        context.hub().publish(Record::default());

        assert_eq!(context.trends().len(), 1);
        assert_eq!(context.hub().subscriber_count(), 0);
    }
}
