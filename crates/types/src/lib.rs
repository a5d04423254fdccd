//! tidewatch-types: Shared data types for the tidewatch telemetry pipeline.
//!
//! This crate contains pure data types (the normalized record, optional-field
//! payloads, field metadata and source configs) shared across all tidewatch
//! crates. It has no runtime or I/O dependencies.

pub mod field;
pub mod raw;
pub mod record;
pub mod source_configs;

// Re-export commonly used types at the crate root for convenience
pub use field::{record_fields, FieldMetadata, FieldType, TrackedField};
pub use raw::{parse_flag, parse_number, RawFields};
pub use record::{clock_timestamp, looks_like_clock, Record, CLOCK_FORMAT};
pub use source_configs::{
    RemoteSourceConfig, SerialSourceConfig, SimulatedSourceConfig, SourceConfig, SourceKind,
};
