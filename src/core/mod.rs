//! Runtime wiring for tidewatch

mod context;
mod trend_recorder;
mod update_manager;

pub use context::TelemetryContext;
pub use trend_recorder::TrendRecorder;
pub use update_manager::{UpdateManager, UpdateStats};
