//! Adapter for the single-sensor feed shape (underscored keys)

use dwlr_core::{FieldValue, Location, PressureUnit, RawRecord, Reading};

use crate::adapter::{
    identifier, optional_number, optional_text, required_number, required_timestamp,
    AdaptedRecord, RecordAdapter,
};
use crate::{MalformedRecordError, SourceFormat};

pub const ID_KEYS: &[&str] = &["Telemetry_UID", "Station_ID", "Sensor_ID"];
pub const DATE_TIME: &str = "Date_Time";
pub const BATTERY: &str = "Battery_V";
pub const WATER_TEMPERATURE: &str = "Water_Temperature";
pub const WATER_LEVEL: &str = "Water_Level";
pub const PRESSURE: &str = "Barometric_Pressure";
pub const ANOMALY: &str = "Anomaly";

pub(crate) const SENSOR_MARKERS: &[&str] = &[DATE_TIME, BATTERY, WATER_TEMPERATURE, WATER_LEVEL, PRESSURE];

/// Maps sensor-feed records onto readings; pressure is in hectopascal.
///
/// The feed describes a single station and usually carries no identifier,
/// so the adapter falls back to `default_station_id`. Without either the
/// record is rejected.
#[derive(Debug, Clone, Default)]
pub struct SensorAdapter {
    default_station_id: Option<String>,
}

impl SensorAdapter {
    pub fn new(default_station_id: Option<String>) -> Self {
        Self {
            default_station_id: default_station_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        }
    }
}

impl RecordAdapter for SensorAdapter {
    fn format(&self) -> SourceFormat {
        SourceFormat::Sensor
    }

    fn adapt(&self, record: &RawRecord) -> Result<AdaptedRecord, MalformedRecordError> {
        let station_id = identifier(record, ID_KEYS)
            .or_else(|| self.default_station_id.clone())
            .ok_or(MalformedRecordError::MissingIdentifier)?;

        let reading = Reading {
            timestamp: required_timestamp(record, DATE_TIME)?,
            water_level_m: required_number(record, WATER_LEVEL)?,
            battery_v: required_number(record, BATTERY)?,
            temperature_c: required_number(record, WATER_TEMPERATURE)?,
            pressure: required_number(record, PRESSURE)?,
            pressure_unit: PressureUnit::Hectopascal,
            reported_anomaly: match record.get(ANOMALY) {
                Some(FieldValue::Bool(flag)) => *flag,
                Some(other) => other
                    .to_text()
                    .map(|a| a.trim().eq_ignore_ascii_case("yes"))
                    .unwrap_or(false),
                None => false,
            },
        };

        let location = Location {
            state: optional_text(record, "State").unwrap_or_default(),
            district: optional_text(record, "District").unwrap_or_default(),
            block: optional_text(record, "Block"),
            village: optional_text(record, "Village").unwrap_or_default(),
            latitude: optional_number(record, "Latitude"),
            longitude: optional_number(record, "Longitude"),
        };

        Ok(AdaptedRecord {
            station_id,
            location,
            reading,
        })
    }
}
