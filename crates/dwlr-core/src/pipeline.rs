use anyhow::Result;

use crate::RawRecord;

/// A telemetry feed returning the full current dataset on every fetch.
///
/// Implementations live outside the core; the core itself never performs I/O.
#[async_trait::async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Fetch the complete batch of raw records
    async fn fetch(&self) -> Result<Vec<RawRecord>>;
}
