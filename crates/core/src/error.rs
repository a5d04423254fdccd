//! Error taxonomy for the ingestion and distribution core
//!
//! None of these are fatal. Each one is handled where it occurs: malformed
//! lines are dropped, lost sources reconnect, failed polls are skipped and
//! failing subscribers are isolated.

use crate::hub::SubscriberId;

/// Result type alias
pub type Result<T> = std::result::Result<T, TelemetryError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TelemetryError {
    /// Transport line too short or garbled
    #[error("malformed line: {fields} fields, at least {minimum} required")]
    MalformedLine { fields: usize, minimum: usize },

    /// Transport or connection failure
    #[error("source lost: {0}")]
    SourceLost(String),

    /// One or both remote requests failed or timed out
    #[error("poll failed: {0}")]
    PollFailure(String),

    /// A delivery sink failed while consuming a record
    #[error("subscriber {id} failed: {reason}")]
    SubscriberFailure { id: SubscriberId, reason: String },

    /// Invalid static configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl TelemetryError {
    /// True for conditions the reconnect controller should act on
    pub fn is_source_lost(&self) -> bool {
        matches!(self, TelemetryError::SourceLost(_))
    }
}
