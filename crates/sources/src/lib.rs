//! tidewatch-sources: Record producers for the tidewatch telemetry pipeline.
//!
//! A live serial source with automatic reconnect, a polled remote source
//! merging two JSON feeds, and a simulated source replaying synthetic
//! samples. The protocol adapter for the sensor unit's line format lives
//! here too.

pub mod line_protocol;
pub mod remote;
mod selector;
pub mod serial;
mod simulated;

pub use line_protocol::{parse_fields, parse_line, parse_line_with_clock, LineFramer};
pub use remote::{HttpFetcher, JsonFetcher, PolledRemoteSource};
pub use selector::ActiveSource;
pub use serial::{
    detect_port, is_likely_sensor, list_ports, LineTransport, LiveSerialSource, PortSummary,
    SerialTransport,
};
pub use simulated::{synthetic_samples, SimulatedSource};
