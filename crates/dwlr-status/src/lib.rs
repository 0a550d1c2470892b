//! Derived station status
//!
//! Status is never stored: it is a pure function of a station's readings and
//! an explicit evaluation time. Two threshold tables coexist and are kept
//! apart on purpose:
//!
//! - [`DashboardHealthPolicy`] drives composite health, trend and the
//!   dashboard counters.
//! - [`AnomalyDetectionPolicy`] drives per-reading anomaly flags.
//!
//! Severity bands are a single fixed table ([`severity_band`]).

pub mod anomaly;
pub mod classifier;
pub mod policy;

pub use anomaly::*;
pub use classifier::*;
pub use policy::*;
