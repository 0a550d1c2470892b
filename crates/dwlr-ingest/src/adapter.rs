//! Adapter seam between raw record shapes and the canonical reading

use chrono::{DateTime, NaiveDateTime, Utc};
use dwlr_core::{FieldValue, Location, RawRecord, Reading};

use crate::{MalformedRecordError, SourceFormat};

/// A raw record mapped onto the canonical model, not yet grouped
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedRecord {
    pub station_id: String,
    pub location: Location,
    pub reading: Reading,
}

/// Converts one raw record shape into [`AdaptedRecord`]s
pub trait RecordAdapter: Send + Sync {
    /// The shape this adapter understands
    fn format(&self) -> SourceFormat;

    fn adapt(&self, record: &RawRecord) -> Result<AdaptedRecord, MalformedRecordError>;
}

/// Naive layouts seen in DWLR exports; interpreted as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Layouts with a numeric offset, optionally with fractional seconds
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parse a source timestamp (RFC 3339 or one of the naive layouts)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }
    // Fractional seconds without an offset
    let trimmed = match raw.split_once('.') {
        Some((head, fraction)) if fraction.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => raw,
    };
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

/// Required finite number under `key`
pub fn required_number(record: &RawRecord, key: &str) -> Result<f64, MalformedRecordError> {
    let value = match record.get(key) {
        None | Some(FieldValue::Null) => {
            return Err(MalformedRecordError::MissingField(key.to_string()))
        }
        Some(value) => value,
    };
    let number = value
        .as_f64()
        .ok_or_else(|| MalformedRecordError::NonNumeric {
            field: key.to_string(),
            value: describe(value),
        })?;
    if !number.is_finite() {
        return Err(MalformedRecordError::NonFinite(key.to_string()));
    }
    Ok(number)
}

/// Optional finite number under `key`; anything unusable reads as absent
pub fn optional_number(record: &RawRecord, key: &str) -> Option<f64> {
    record
        .get(key)
        .and_then(FieldValue::as_f64)
        .filter(|v| v.is_finite())
}

/// Optional trimmed, non-empty text under `key`
pub fn optional_text(record: &RawRecord, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(FieldValue::to_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// First non-empty identifier among `keys`
pub fn identifier(record: &RawRecord, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| optional_text(record, key))
}

/// Required timestamp under `key`
pub fn required_timestamp(
    record: &RawRecord,
    key: &str,
) -> Result<DateTime<Utc>, MalformedRecordError> {
    let raw = match record.get(key) {
        None | Some(FieldValue::Null) => {
            return Err(MalformedRecordError::MissingField(key.to_string()))
        }
        Some(value) => value,
    };
    let text = raw
        .to_text()
        .ok_or_else(|| MalformedRecordError::InvalidTimestamp(describe(raw)))?;
    parse_timestamp(&text).ok_or(MalformedRecordError::InvalidTimestamp(text))
}

fn describe(value: &FieldValue) -> String {
    match value {
        FieldValue::String(s) => s.clone(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Null => "null".to_string(),
        other => other.to_text().unwrap_or_default(),
    }
}
