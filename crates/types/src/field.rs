//! Field metadata for describing what a telemetry record carries

use serde::{Deserialize, Serialize};

/// Type of data a field contains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    /// Text data (e.g., a clock string)
    Text,
    /// Numerical data (e.g., 104.2)
    Numerical,
    /// Boolean value
    Boolean,
}

/// Metadata describing a single record field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Key used in the serialized record
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Unit of measurement, empty when dimensionless
    pub unit: String,
    /// Type of data this field contains
    pub field_type: FieldType,
}

impl FieldMetadata {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        field_type: FieldType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit: unit.into(),
            field_type,
        }
    }
}

/// Fields that keep a rolling history for trend views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedField {
    Salinity,
    Turbidity,
    Pressure,
    InternalTemp,
    ExternalTemp,
    Conductivity,
    Ph,
}

impl TrackedField {
    pub const ALL: [TrackedField; 7] = [
        TrackedField::Salinity,
        TrackedField::Turbidity,
        TrackedField::Pressure,
        TrackedField::InternalTemp,
        TrackedField::ExternalTemp,
        TrackedField::Conductivity,
        TrackedField::Ph,
    ];

    /// Record key for this field
    pub fn key(self) -> &'static str {
        match self {
            TrackedField::Salinity => "salinity",
            TrackedField::Turbidity => "turbidity",
            TrackedField::Pressure => "pressure",
            TrackedField::InternalTemp => "intTemp",
            TrackedField::ExternalTemp => "extTemp",
            TrackedField::Conductivity => "conductivity",
            TrackedField::Ph => "ph",
        }
    }

    pub fn metadata(self) -> FieldMetadata {
        let (name, unit) = match self {
            TrackedField::Salinity => ("TDS", "ppm"),
            TrackedField::Turbidity => ("Turbidity", "NTU"),
            TrackedField::Pressure => ("Pressure", "kPa"),
            TrackedField::InternalTemp => ("Int Temp", "°C"),
            TrackedField::ExternalTemp => ("Ext Temp", "°C"),
            TrackedField::Conductivity => ("Conductivity", "mS/cm"),
            TrackedField::Ph => ("pH", ""),
        };
        FieldMetadata::new(self.key(), name, unit, FieldType::Numerical)
    }
}

/// Metadata for every field of a [`crate::Record`], in wire order
pub fn record_fields() -> Vec<FieldMetadata> {
    use FieldType::*;
    vec![
        FieldMetadata::new("timestamp", "Timestamp", "", Text),
        FieldMetadata::new("speed", "Speed", "m/s", Numerical),
        FieldMetadata::new("ph", "pH", "", Numerical),
        FieldMetadata::new("salinity", "Salinity", "ppm", Numerical),
        FieldMetadata::new("pressure", "Pressure", "kPa", Numerical),
        FieldMetadata::new("turbidity", "Turbidity", "NTU", Numerical),
        FieldMetadata::new("energy", "Energy", "mAh", Numerical),
        FieldMetadata::new("load", "Load", "%", Numerical),
        FieldMetadata::new("leak", "Leak", "", Boolean),
        FieldMetadata::new("depth", "Depth", "m", Numerical),
        FieldMetadata::new("altitude", "Altitude", "m", Numerical),
        FieldMetadata::new("intTemp", "Internal Temperature", "°C", Numerical),
        FieldMetadata::new("extTemp", "External Temperature", "°C", Numerical),
        FieldMetadata::new("conductivity", "Conductivity", "mS/cm", Numerical),
        FieldMetadata::new("accX", "Acceleration X", "g", Numerical),
        FieldMetadata::new("accY", "Acceleration Y", "g", Numerical),
        FieldMetadata::new("accZ", "Acceleration Z", "g", Numerical),
        FieldMetadata::new("gyroX", "Angular Rate X", "°/s", Numerical),
        FieldMetadata::new("gyroY", "Angular Rate Y", "°/s", Numerical),
        FieldMetadata::new("gyroZ", "Angular Rate Z", "°/s", Numerical),
    ]
}
