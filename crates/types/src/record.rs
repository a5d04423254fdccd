//! Canonical telemetry record and its normalization rules

use serde::{Deserialize, Serialize};

use crate::field::TrackedField;
use crate::raw::RawFields;

/// Clock format used for timestamps, both on the wire and when one is
/// synthesized from arrival time.
pub const CLOCK_FORMAT: &str = "%H:%M:%S";

/// One normalized, fully-typed telemetry sample.
///
/// Every numeric field is finite. Missing or unparseable inputs become `0.0`,
/// so a record is never partially typed. Records are built once per ingested
/// line or poll and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub timestamp: String,
    pub speed: f64,
    pub ph: f64,
    pub salinity: f64,
    pub pressure: f64,
    pub turbidity: f64,
    pub energy: f64,
    pub load: f64,
    pub leak: bool,
    pub depth: f64,
    pub altitude: f64,
    pub int_temp: f64,
    pub ext_temp: f64,
    pub conductivity: f64,
    pub acc_x: f64,
    pub acc_y: f64,
    pub acc_z: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
}

impl Record {
    /// Normalize raw fields, stamping the record with the current wall-clock
    /// time if the raw fields carry no clock string.
    pub fn from_raw(raw: RawFields) -> Self {
        Self::from_raw_with_clock(raw, clock_timestamp)
    }

    /// Normalize raw fields, using `now` to produce the timestamp when the
    /// raw timestamp is absent or does not look like a clock string.
    pub fn from_raw_with_clock(raw: RawFields, now: impl FnOnce() -> String) -> Self {
        let timestamp = match raw.timestamp {
            Some(ts) if looks_like_clock(&ts) => ts,
            _ => now(),
        };

        Self {
            timestamp,
            speed: finite(raw.speed),
            ph: finite(raw.ph),
            salinity: finite(raw.salinity.or(raw.tds)),
            pressure: finite(raw.pressure),
            turbidity: finite(raw.turbidity),
            energy: finite(raw.energy),
            load: finite(raw.load),
            leak: raw.leak.unwrap_or(false),
            depth: finite(raw.depth),
            altitude: finite(raw.altitude),
            int_temp: finite(raw.int_temp),
            ext_temp: finite(raw.ext_temp),
            conductivity: finite(raw.conductivity),
            // Per-axis values win; the legacy scalar fills any missing axis.
            acc_x: finite(raw.acc_x.or(raw.acc)),
            acc_y: finite(raw.acc_y.or(raw.acc)),
            acc_z: finite(raw.acc_z.or(raw.acc)),
            gyro_x: finite(raw.gyro_x.or(raw.gyro)),
            gyro_y: finite(raw.gyro_y.or(raw.gyro)),
            gyro_z: finite(raw.gyro_z.or(raw.gyro)),
        }
    }

    /// Value of a trend-tracked field
    pub fn value(&self, field: TrackedField) -> f64 {
        match field {
            TrackedField::Salinity => self.salinity,
            TrackedField::Turbidity => self.turbidity,
            TrackedField::Pressure => self.pressure,
            TrackedField::InternalTemp => self.int_temp,
            TrackedField::ExternalTemp => self.ext_temp,
            TrackedField::Conductivity => self.conductivity,
            TrackedField::Ph => self.ph,
        }
    }

    pub fn acceleration(&self) -> [f64; 3] {
        [self.acc_x, self.acc_y, self.acc_z]
    }

    pub fn angular_rate(&self) -> [f64; 3] {
        [self.gyro_x, self.gyro_y, self.gyro_z]
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::from_raw_with_clock(RawFields::default(), || "00:00:00".to_string())
    }
}

/// A timestamp is taken from the source only if it contains a clock separator.
pub fn looks_like_clock(text: &str) -> bool {
    text.contains(':')
}

/// Current local wall-clock time in [`CLOCK_FORMAT`].
pub fn clock_timestamp() -> String {
    chrono::Local::now().format(CLOCK_FORMAT).to_string()
}

fn finite(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_clock() -> String {
        "12:34:56".to_string()
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let record = Record::from_raw_with_clock(RawFields::default(), fixed_clock);

        assert_eq!(record.timestamp, "12:34:56");
        assert_eq!(record.speed, 0.0);
        assert_eq!(record.salinity, 0.0);
        assert_eq!(record.acceleration(), [0.0, 0.0, 0.0]);
        assert!(!record.leak);
    }

    #[test]
    fn test_non_finite_values_become_zero() {
        let raw = RawFields {
            pressure: Some(f64::NAN),
            depth: Some(f64::INFINITY),
            ph: Some(7.2),
            ..RawFields::default()
        };
        let record = Record::from_raw_with_clock(raw, fixed_clock);

        assert_eq!(record.pressure, 0.0);
        assert_eq!(record.depth, 0.0);
        assert!((record.ph - 7.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_salinity_falls_back_to_tds() {
        let raw = RawFields {
            tds: Some(1800.0),
            ..RawFields::default()
        };
        assert_eq!(Record::from_raw_with_clock(raw, fixed_clock).salinity, 1800.0);

        let raw = RawFields {
            salinity: Some(1900.0),
            tds: Some(1800.0),
            ..RawFields::default()
        };
        assert_eq!(Record::from_raw_with_clock(raw, fixed_clock).salinity, 1900.0);
    }

    #[test]
    fn test_legacy_scalar_replicates_across_axes() {
        let raw = RawFields {
            acc: Some(0.1),
            gyro: Some(10.0),
            gyro_y: Some(-3.0),
            ..RawFields::default()
        };
        let record = Record::from_raw_with_clock(raw, fixed_clock);

        assert_eq!(record.acceleration(), [0.1, 0.1, 0.1]);
        assert_eq!(record.angular_rate(), [10.0, -3.0, 10.0]);
    }

    #[test]
    fn test_timestamp_without_separator_is_replaced() {
        let raw = RawFields {
            timestamp: Some("123456".to_string()),
            ..RawFields::default()
        };
        assert_eq!(Record::from_raw_with_clock(raw, fixed_clock).timestamp, "12:34:56");

        let raw = RawFields {
            timestamp: Some("08:00:00".to_string()),
            ..RawFields::default()
        };
        assert_eq!(Record::from_raw_with_clock(raw, fixed_clock).timestamp, "08:00:00");
    }

    #[test]
    fn test_serialized_keys() {
        let record = Record::default();
        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();

        for key in ["timestamp", "ph", "intTemp", "extTemp", "accX", "gyroZ", "leak"] {
            assert!(obj.contains_key(key), "missing key {}", key);
        }
        assert_eq!(obj.len(), 20);
    }

    #[test]
    fn test_clock_timestamp_format() {
        let ts = clock_timestamp();
        assert_eq!(ts.len(), 8);
        assert!(looks_like_clock(&ts));
    }
}
