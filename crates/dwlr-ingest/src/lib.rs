//! Telemetry ingestion: raw record adapters, normalization and sources
//!
//! Raw DWLR feeds arrive in one of two shapes (human-readable keys such as
//! `"Water Level (m)"`, or underscored keys such as `"Water_Level"`). Each
//! shape has an explicit adapter; the normalizer groups adapted records into
//! canonical [`Station`](dwlr_core::Station)s.

pub mod adapter;
pub mod dwlr;
pub mod format;
pub mod normalizer;
pub mod sensor;
pub mod simulator;
pub mod source;

pub use adapter::*;
pub use dwlr::DwlrAdapter;
pub use format::*;
pub use normalizer::*;
pub use sensor::SensorAdapter;
pub use simulator::*;
pub use source::*;

use thiserror::Error;

/// A single raw record that could not be turned into a reading.
///
/// Recoverable: the record is skipped and the rest of the batch continues.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MalformedRecordError {
    #[error("Missing or empty station identifier")]
    MissingIdentifier,

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Non-numeric value for {field}: {value}")]
    NonNumeric { field: String, value: String },

    #[error("Non-finite value for {0}")]
    NonFinite(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Errors that reject a whole batch
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Unable to detect source format")]
    UnknownFormat,

    #[error("Unknown source format: {0}")]
    UnsupportedFormat(String),

    #[error("Source error: {0}")]
    Source(String),
}

pub type IngestResult<T> = Result<T, IngestError>;
