//! Optional-field telemetry payloads, before normalization
//!
//! Both the serial line protocol and the remote JSON feeds produce a
//! [`RawFields`]. Each field is either present or absent; merging two payloads
//! resolves every key by a fixed precedence rule instead of inspecting the
//! payload dynamically.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Telemetry fields as received, each one optional.
///
/// Deserializes from the JSON objects served by remote feeds. Values may
/// arrive as numbers, numeric strings, booleans or null; anything that does
/// not yield a finite number is treated as absent. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub speed: Option<f64>,
    #[serde(default, alias = "pH", deserialize_with = "lenient_number")]
    pub ph: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub salinity: Option<f64>,
    /// Raw total-dissolved-solids reading, used when salinity is absent
    #[serde(default, deserialize_with = "lenient_number")]
    pub tds: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub pressure: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub turbidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub energy: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub load: Option<f64>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub leak: Option<bool>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub depth: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub altitude: Option<f64>,
    #[serde(default, rename = "intTemp", alias = "itemp", deserialize_with = "lenient_number")]
    pub int_temp: Option<f64>,
    #[serde(default, rename = "extTemp", alias = "etemp", deserialize_with = "lenient_number")]
    pub ext_temp: Option<f64>,
    #[serde(default, alias = "cond", deserialize_with = "lenient_number")]
    pub conductivity: Option<f64>,
    /// Legacy single-axis acceleration
    #[serde(default, deserialize_with = "lenient_number")]
    pub acc: Option<f64>,
    #[serde(default, rename = "accX", deserialize_with = "lenient_number")]
    pub acc_x: Option<f64>,
    #[serde(default, rename = "accY", deserialize_with = "lenient_number")]
    pub acc_y: Option<f64>,
    #[serde(default, rename = "accZ", deserialize_with = "lenient_number")]
    pub acc_z: Option<f64>,
    /// Legacy single-axis angular rate
    #[serde(default, deserialize_with = "lenient_number")]
    pub gyro: Option<f64>,
    #[serde(default, rename = "gyroX", deserialize_with = "lenient_number")]
    pub gyro_x: Option<f64>,
    #[serde(default, rename = "gyroY", deserialize_with = "lenient_number")]
    pub gyro_y: Option<f64>,
    #[serde(default, rename = "gyroZ", deserialize_with = "lenient_number")]
    pub gyro_z: Option<f64>,
}

impl RawFields {
    /// Build from a decoded JSON object
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Overlay `other` on top of `self`.
    ///
    /// Every field present in `other` replaces the one in `self`; fields absent
    /// from `other` keep the value from `self`.
    pub fn merge(self, other: RawFields) -> RawFields {
        RawFields {
            timestamp: other.timestamp.or(self.timestamp),
            speed: other.speed.or(self.speed),
            ph: other.ph.or(self.ph),
            salinity: other.salinity.or(self.salinity),
            tds: other.tds.or(self.tds),
            pressure: other.pressure.or(self.pressure),
            turbidity: other.turbidity.or(self.turbidity),
            energy: other.energy.or(self.energy),
            load: other.load.or(self.load),
            leak: other.leak.or(self.leak),
            depth: other.depth.or(self.depth),
            altitude: other.altitude.or(self.altitude),
            int_temp: other.int_temp.or(self.int_temp),
            ext_temp: other.ext_temp.or(self.ext_temp),
            conductivity: other.conductivity.or(self.conductivity),
            acc: other.acc.or(self.acc),
            acc_x: other.acc_x.or(self.acc_x),
            acc_y: other.acc_y.or(self.acc_y),
            acc_z: other.acc_z.or(self.acc_z),
            gyro: other.gyro.or(self.gyro),
            gyro_x: other.gyro_x.or(self.gyro_x),
            gyro_y: other.gyro_y.or(self.gyro_y),
            gyro_z: other.gyro_z.or(self.gyro_z),
        }
    }
}

/// Parse a textual number, returning `None` for empty, garbled or non-finite input.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Interpret a textual flag. Numeric values are true when non-zero.
pub fn parse_flag(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(number) = parse_number(text) {
        return Some(number != 0.0);
    }
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(Value::String(s)) => parse_number(&s),
        Some(Value::Bool(b)) => Some(if b { 1.0 } else { 0.0 }),
        _ => None,
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0),
        Some(Value::String(s)) => parse_flag(&s),
        _ => None,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_values() {
        let raw = RawFields::from_json(json!({
            "speed": "5.5",
            "ph": 7.1,
            "pressure": "not a number",
            "depth": null,
            "leak": "1",
            "itemp": 31.5,
            "cond": "55",
            "unknown_key": [1, 2, 3]
        }))
        .unwrap();

        assert_eq!(raw.speed, Some(5.5));
        assert_eq!(raw.ph, Some(7.1));
        assert_eq!(raw.pressure, None);
        assert_eq!(raw.depth, None);
        assert_eq!(raw.leak, Some(true));
        assert_eq!(raw.int_temp, Some(31.5));
        assert_eq!(raw.conductivity, Some(55.0));
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let principal = RawFields::from_json(json!({"pressure": 104, "turbidity": 2.0})).unwrap();
        let supplementary = RawFields::from_json(json!({"turbidity": 1.4})).unwrap();

        let merged = principal.merge(supplementary);
        assert_eq!(merged.pressure, Some(104.0));
        assert_eq!(merged.turbidity, Some(1.4));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("2"), Some(true));
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(""), None);
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_parse_number_rejects_non_finite() {
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(""), None);
    }
}
