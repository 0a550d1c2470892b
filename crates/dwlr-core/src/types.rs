//! Core data types for groundwater telemetry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::units::PressureUnit;

/// Point in time of an observation (always UTC)
pub type Timestamp = DateTime<Utc>;

/// A raw telemetry record as delivered by a data source.
///
/// Keys are the source's own field names (`"Water Level (m)"`,
/// `"Battery_V"`, ...). Nothing about presence or type is guaranteed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct RawRecord {
    pub fields: HashMap<String, FieldValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for fixtures and the simulator
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A raw field value with optional null handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Bool(bool),
    String(String),
    Null,
}

impl FieldValue {
    /// Numeric view of the value; numeric strings are accepted
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Textual view of the value; numbers are rendered, null and bools are not
    pub fn to_text(&self) -> Option<String> {
        match self {
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Integer(v) => Some(v.to_string()),
            FieldValue::Float(v) => Some(v.to_string()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

/// Where a monitoring station is installed
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub state: String,
    pub district: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    pub village: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// One observation from a DWLR device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    pub timestamp: Timestamp,

    /// Meters relative to ground level, negative is below ground
    pub water_level_m: f64,

    pub battery_v: f64,

    pub temperature_c: f64,

    /// Barometric pressure in `pressure_unit`
    pub pressure: f64,

    pub pressure_unit: PressureUnit,

    /// Anomaly flag attached by the source itself
    #[serde(default)]
    pub reported_anomaly: bool,
}

impl Reading {
    /// Pressure expressed in hectopascal regardless of source unit
    pub fn pressure_hpa(&self) -> f64 {
        self.pressure_unit.to_hpa(self.pressure)
    }

    /// Value of a metric as stored (pressure in its source unit)
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::WaterLevel => self.water_level_m,
            Metric::Battery => self.battery_v,
            Metric::Temperature => self.temperature_c,
            Metric::Pressure => self.pressure,
        }
    }

    /// True when every numeric field is a finite number
    pub fn is_finite(&self) -> bool {
        Metric::ALL.iter().all(|m| self.metric(*m).is_finite())
    }
}

/// The measured quantities of a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    WaterLevel,
    Battery,
    Temperature,
    Pressure,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::WaterLevel,
        Metric::Battery,
        Metric::Temperature,
        Metric::Pressure,
    ];
}

/// A monitoring station and its readings.
///
/// Readings are kept ascending by timestamp; the latest reading is the last
/// element. `Station::new` establishes the order, so every station built
/// through it obeys it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Station {
    id: String,
    location: Location,
    readings: Vec<Reading>,
}

impl Station {
    pub fn new(id: impl Into<String>, location: Location, mut readings: Vec<Reading>) -> Self {
        readings.sort_by_key(|r| r.timestamp);
        Self {
            id: id.into(),
            location,
            readings,
        }
    }

    /// Telemetry UID
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Readings, oldest first
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.last()
    }

    /// The reading immediately before the latest one
    pub fn previous(&self) -> Option<&Reading> {
        self.readings.len().checked_sub(2).map(|i| &self.readings[i])
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Water-level severity band of a station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBand {
    Excellent,
    Good,
    Moderate,
    Poor,
    Critical,
}

impl SeverityBand {
    pub const ALL: [SeverityBand; 5] = [
        SeverityBand::Excellent,
        SeverityBand::Good,
        SeverityBand::Moderate,
        SeverityBand::Poor,
        SeverityBand::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityBand::Excellent => "excellent",
            SeverityBand::Good => "good",
            SeverityBand::Moderate => "moderate",
            SeverityBand::Poor => "poor",
            SeverityBand::Critical => "critical",
        }
    }
}

/// Composite station health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Normal,
    Warning,
    Critical,
    Offline,
}

impl HealthStatus {
    pub const ALL: [HealthStatus; 4] = [
        HealthStatus::Normal,
        HealthStatus::Warning,
        HealthStatus::Critical,
        HealthStatus::Offline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Normal => "normal",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
            HealthStatus::Offline => "offline",
        }
    }

    /// Warning and critical stations need attention
    pub fn is_alert(&self) -> bool {
        matches!(self, HealthStatus::Warning | HealthStatus::Critical)
    }
}

/// Direction of the latest water-level change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl Trend {
    pub const ALL: [Trend; 3] = [Trend::Rising, Trend::Falling, Trend::Stable];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
        }
    }
}

/// Severity attached to anomaly flags, in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
    Critical,
}
