//! Record source trait and related types

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tidewatch_types::{record_fields, FieldMetadata, Record};

/// Metadata about a record source
#[derive(Debug, Clone)]
pub struct SourceMetadata {
    /// Unique identifier for this source type
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Description of where records come from
    pub description: String,
    /// Nominal cadence, `None` when records arrive as the transport delivers them
    pub nominal_interval: Option<Duration>,
}

/// Trait for all record producers
///
/// A source turns some upstream feed (a serial transport, remote HTTP feeds,
/// a synthetic buffer) into a sequence of normalized records. Exactly one
/// source is active per process.
pub trait RecordSource: Send {
    /// Get metadata about this source
    fn metadata(&self) -> &SourceMetadata;

    /// Fields carried by every record this source produces
    fn fields(&self) -> Vec<FieldMetadata> {
        record_fields()
    }

    /// Produce the next record.
    ///
    /// Suspends until a record is available. Recoverable failures are
    /// returned as errors; calling again resumes the source, so a caller can
    /// log the error and keep pulling.
    fn next_record(&mut self) -> impl Future<Output = Result<Record>> + Send;
}
