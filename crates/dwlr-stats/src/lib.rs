//! Dashboard statistics
//!
//! Aggregates classified stations into the figures shown on the monitoring
//! dashboards: means and extremes of the latest readings, category
//! breakdowns, period-over-period changes and per-state rollups. Everything
//! here is pure; inputs are never mutated.

pub mod aggregator;
pub mod filter;
pub mod readings;
pub mod window;

pub use aggregator::*;
pub use filter::*;
pub use readings::*;
pub use window::*;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StatsError {
    #[error("Unknown station filter: {0}")]
    UnknownFilter(String),
}

pub type StatsResult<T> = Result<T, StatsError>;
