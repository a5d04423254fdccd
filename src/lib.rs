//! tidewatch: Real-time marine sensor telemetry ingestion and fan-out
//!
//! This library provides:
//! - Application configuration
//! - The update loop that drives the active source into the broadcast hub
//! - The trend recorder backing rolling trend views and analytics
//! - A TCP publisher streaming records to external viewers

pub mod config;
pub mod core;
pub mod publisher;

// Re-export commonly used types
pub use crate::core::{TelemetryContext, TrendRecorder, UpdateManager};
pub use config::{AppConfig, PublisherConfig};
pub use publisher::TcpPublisher;
