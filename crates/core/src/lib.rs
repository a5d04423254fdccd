//! tidewatch-core: Distribution core of the tidewatch telemetry pipeline.
//!
//! This crate contains the record source trait, the broadcast hub that fans
//! records out to subscribers, the rolling window buffers behind trend views,
//! the reconnect controller for transport-backed sources, and the shared
//! error taxonomy.

pub mod analytics;
pub mod constants;
mod error;
pub mod hub;
pub mod reconnect;
mod record_source;
pub mod rolling_window;

pub use analytics::AnalyticsSummary;
pub use constants::{
    DEFAULT_RECONNECT_DELAY, DEFAULT_WINDOW_CAPACITY, LINE_DELIMITER, LINE_FIELD_COUNT,
    MIN_LINE_FIELDS,
};
pub use error::{Result, TelemetryError};
pub use hub::{BroadcastHub, PublishReport, Subscriber, SubscriberId};
pub use reconnect::{LinkCommand, LinkEvent, LinkState, ReconnectController};
pub use record_source::{RecordSource, SourceMetadata};
pub use rolling_window::{RollingWindow, TrendSet, WindowSnapshot};

// Re-export types used in trait signatures for convenience
pub use tidewatch_types::{FieldMetadata, Record, TrackedField};
