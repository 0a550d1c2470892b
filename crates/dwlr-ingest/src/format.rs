//! Source format tags and detection

use dwlr_core::RawRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::dwlr::DWLR_MARKERS;
use crate::sensor::SENSOR_MARKERS;
use crate::IngestError;

/// The raw record shapes understood by the normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Human-readable keys (`"Water Level (m)"`, `"Date & Time"`)
    Dwlr,
    /// Underscored keys (`"Water_Level"`, `"Date_Time"`)
    Sensor,
}

impl SourceFormat {
    /// Detect the format of a batch from its first non-empty record
    pub fn detect(records: &[RawRecord]) -> Option<Self> {
        records
            .iter()
            .find(|r| !r.is_empty())
            .and_then(Self::detect_record)
    }

    /// Detect the format of a single record
    pub fn detect_record(record: &RawRecord) -> Option<Self> {
        let score = |markers: &[&str]| markers.iter().filter(|k| record.contains_key(k)).count();
        let dwlr = score(DWLR_MARKERS);
        let sensor = score(SENSOR_MARKERS);
        match (dwlr, sensor) {
            (0, 0) => None,
            (d, s) if d >= s => Some(SourceFormat::Dwlr),
            _ => Some(SourceFormat::Sensor),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Dwlr => "dwlr",
            SourceFormat::Sensor => "sensor",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dwlr" | "dwlr_data" => Ok(SourceFormat::Dwlr),
            "sensor" | "sensor_data" => Ok(SourceFormat::Sensor),
            other => Err(IngestError::UnsupportedFormat(other.to_string())),
        }
    }
}
