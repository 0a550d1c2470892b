//! Adapter for the DWLR export shape (human-readable keys)

use dwlr_core::{Location, PressureUnit, RawRecord, Reading};

use crate::adapter::{
    identifier, optional_number, optional_text, required_number, required_timestamp,
    AdaptedRecord, RecordAdapter,
};
use crate::{MalformedRecordError, SourceFormat};

pub const UID: &str = "Telemetry_UID";
pub const STATE: &str = "State";
pub const DISTRICT: &str = "District";
pub const BLOCK: &str = "Block";
pub const VILLAGE: &str = "Village";
pub const LATITUDE: &str = "Latitude";
pub const LONGITUDE: &str = "Longitude";
pub const DATE_TIME: &str = "Date & Time";
pub const BATTERY: &str = "Battery (V)";
pub const WATER_TEMPERATURE: &str = "Water Temperature (°C)";
pub const WATER_LEVEL: &str = "Water Level (m)";
pub const PRESSURE: &str = "Barometric Pressure (mH2O)";
pub const ANOMALY: &str = "Anomaly";

/// Keys whose presence identifies this shape
pub(crate) const DWLR_MARKERS: &[&str] = &[DATE_TIME, BATTERY, WATER_TEMPERATURE, WATER_LEVEL, PRESSURE];

/// Maps `DWLR_DATA` records onto readings; pressure is a water column (mH2O)
#[derive(Debug, Clone, Default)]
pub struct DwlrAdapter;

impl DwlrAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl RecordAdapter for DwlrAdapter {
    fn format(&self) -> SourceFormat {
        SourceFormat::Dwlr
    }

    fn adapt(&self, record: &RawRecord) -> Result<AdaptedRecord, MalformedRecordError> {
        let station_id = identifier(record, &[UID]).ok_or(MalformedRecordError::MissingIdentifier)?;

        let reading = Reading {
            timestamp: required_timestamp(record, DATE_TIME)?,
            water_level_m: required_number(record, WATER_LEVEL)?,
            battery_v: required_number(record, BATTERY)?,
            temperature_c: required_number(record, WATER_TEMPERATURE)?,
            pressure: required_number(record, PRESSURE)?,
            pressure_unit: PressureUnit::MetresH2O,
            // "Normal" | "Warning" | "Critical"
            reported_anomaly: optional_text(record, ANOMALY)
                .map(|a| !a.eq_ignore_ascii_case("normal"))
                .unwrap_or(false),
        };

        let location = Location {
            state: optional_text(record, STATE).unwrap_or_default(),
            district: optional_text(record, DISTRICT).unwrap_or_default(),
            block: optional_text(record, BLOCK),
            village: optional_text(record, VILLAGE).unwrap_or_default(),
            latitude: optional_number(record, LATITUDE),
            longitude: optional_number(record, LONGITUDE),
        };

        Ok(AdaptedRecord {
            station_id,
            location,
            reading,
        })
    }
}
