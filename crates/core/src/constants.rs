//! Shared constants for the telemetry pipeline

use std::time::Duration;

/// Default number of values kept per trend window
pub const DEFAULT_WINDOW_CAPACITY: usize = 50;

/// Fixed delay between a lost link and the next connection attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Transport lines with fewer fields than this are dropped
pub const MIN_LINE_FIELDS: usize = 10;

/// Number of positional fields in a complete transport line
pub const LINE_FIELD_COUNT: usize = 16;

/// Field delimiter of the transport line format
pub const LINE_DELIMITER: char = ',';
