//! Core data types, units, and rollup calculations for DWLR telemetry
//!
//! This crate provides the canonical station and reading model shared by
//! the normalizer, the status classifier and the aggregator.

pub mod pipeline;
pub mod rollups;
pub mod types;
pub mod units;

pub use pipeline::*;
pub use rollups::*;
pub use types::*;
pub use units::*;
