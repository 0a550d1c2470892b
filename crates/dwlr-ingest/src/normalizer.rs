//! Grouping of adapted records into canonical stations

use dwlr_core::{Location, RawRecord, Reading, Station};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use crate::{
    DwlrAdapter, IngestError, IngestResult, MalformedRecordError, RecordAdapter, SensorAdapter,
    SourceFormat,
};

/// A raw record that was dropped from a batch
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// Position of the record in the input batch
    pub index: usize,
    pub error: MalformedRecordError,
}

/// Result of normalizing one batch
#[derive(Debug, Clone)]
pub struct Normalized {
    pub format: SourceFormat,
    /// Stations in order of first appearance in the batch
    pub stations: Vec<Station>,
    pub skipped: Vec<SkippedRecord>,
}

impl Normalized {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn reading_count(&self) -> usize {
        self.stations.iter().map(Station::len).sum()
    }

    pub fn report(&self) -> NormalizeReport {
        NormalizeReport {
            format: self.format,
            stations: self.stations.len(),
            readings: self.reading_count(),
            skipped: self.skipped_count(),
        }
    }
}

/// Batch counters, suitable for logs and API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub format: SourceFormat,
    pub stations: usize,
    pub readings: usize,
    pub skipped: usize,
}

/// Turns raw batches of one format into stations
pub struct Normalizer {
    adapter: Box<dyn RecordAdapter>,
}

impl Normalizer {
    pub fn new(adapter: Box<dyn RecordAdapter>) -> Self {
        Self { adapter }
    }

    /// Normalizer for `format`; `default_station_id` only applies to the sensor feed
    pub fn for_format(format: SourceFormat, default_station_id: Option<String>) -> Self {
        match format {
            SourceFormat::Dwlr => Self::new(Box::new(DwlrAdapter::new())),
            SourceFormat::Sensor => Self::new(Box::new(SensorAdapter::new(default_station_id))),
        }
    }

    pub fn format(&self) -> SourceFormat {
        self.adapter.format()
    }

    /// Group records by telemetry UID, readings ascending by timestamp.
    ///
    /// Malformed records are skipped and reported; they never abort the batch.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn normalize(&self, records: &[RawRecord]) -> Normalized {
        let mut order: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(String, Location, Vec<Reading>)> = Vec::new();
        let mut skipped = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match self.adapter.adapt(record) {
                Ok(adapted) => match order.get(&adapted.station_id) {
                    Some(&slot) => groups[slot].2.push(adapted.reading),
                    None => {
                        order.insert(adapted.station_id.clone(), groups.len());
                        groups.push((adapted.station_id, adapted.location, vec![adapted.reading]));
                    }
                },
                Err(error) => {
                    debug!(index, %error, "skipping malformed record");
                    skipped.push(SkippedRecord { index, error });
                }
            }
        }

        let stations: Vec<Station> = groups
            .into_iter()
            .map(|(id, location, readings)| Station::new(id, location, readings))
            .collect();

        let normalized = Normalized {
            format: self.format(),
            stations,
            skipped,
        };
        let report = normalized.report();
        info!(
            stations = report.stations,
            readings = report.readings,
            skipped = report.skipped,
            "Normalized telemetry batch"
        );
        normalized
    }
}

/// Normalize a batch of a known format
pub fn normalize(records: &[RawRecord], format: SourceFormat) -> Normalized {
    Normalizer::for_format(format, None).normalize(records)
}

/// Detect the batch format, then normalize.
///
/// An empty batch normalizes to no stations under the DWLR format.
pub fn normalize_auto(
    records: &[RawRecord],
    default_station_id: Option<String>,
) -> IngestResult<Normalized> {
    if records.is_empty() {
        return Ok(Normalizer::for_format(SourceFormat::Dwlr, None).normalize(records));
    }
    let format = SourceFormat::detect(records).ok_or(IngestError::UnknownFormat)?;
    Ok(Normalizer::for_format(format, default_station_id).normalize(records))
}

/// Decode a JSON array of records.
///
/// Elements that are not JSON objects decode as empty records, so they are
/// skipped by the normalizer while keeping their batch index. A payload that
/// is not an array is rejected.
pub fn parse_records(payload: &[u8]) -> IngestResult<Vec<RawRecord>> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(payload)?;
    Ok(values
        .into_iter()
        .map(|value| match value {
            serde_json::Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => RawRecord::default(),
        })
        .collect())
}
