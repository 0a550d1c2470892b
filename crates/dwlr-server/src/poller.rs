//! Periodic telemetry polling
//!
//! Each tick starts an independent fetch tagged with the next sequence number.
//! Fetches are never cancelled; when one completes it is applied only if no
//! later-started fetch has been applied already.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{Context, Result};
use dwlr_core::TelemetrySource;
use dwlr_ingest::{normalize_auto, Normalizer, SourceFormat};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::{apply_snapshot, AppState};

pub struct Poller {
    source: Arc<dyn TelemetrySource>,
    interval: Duration,
    format: Option<SourceFormat>,
    default_station_id: Option<String>,
    sequence: AtomicU64,
}

impl Poller {
    pub fn new(source: Arc<dyn TelemetrySource>, interval: Duration) -> Self {
        Self {
            source,
            interval,
            format: None,
            default_station_id: None,
            sequence: AtomicU64::new(0),
        }
    }

    /// Fix the record format instead of detecting it per batch
    pub fn with_format(mut self, format: Option<SourceFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn with_default_station_id(mut self, station_id: Option<String>) -> Self {
        self.default_station_id = station_id;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Fetch once and wait for the result
    pub async fn poll_once(&self, state: &Arc<AppState>) -> Result<bool> {
        let sequence = self.next_sequence();
        self.fetch_and_apply(state, sequence).await
    }

    #[instrument(skip(self, state))]
    async fn fetch_and_apply(&self, state: &Arc<AppState>, sequence: u64) -> Result<bool> {
        let records = self
            .source
            .fetch()
            .await
            .with_context(|| format!("Fetch from {} source failed", self.source.name()))?;
        debug!(records = records.len(), "Fetched telemetry batch");

        let default_station_id = self.default_station_id.clone();
        let normalized = match self.format {
            Some(format) => Normalizer::for_format(format, default_station_id).normalize(&records),
            None => normalize_auto(&records, default_station_id)
                .context("Failed to normalize telemetry batch")?,
        };
        Ok(apply_snapshot(state, sequence, normalized).await)
    }

    /// Poll on every tick until the task is aborted.
    ///
    /// The first tick fires immediately. Failed fetches are logged and the
    /// loop continues.
    pub fn spawn(self: Arc<Self>, state: Arc<AppState>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                source = self.source.name(),
                interval_secs = self.interval.as_secs(),
                "Poller started"
            );

            loop {
                ticker.tick().await;
                let sequence = self.next_sequence();
                let poller = Arc::clone(&self);
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    if let Err(e) = poller.fetch_and_apply(&state, sequence).await {
                        warn!(sequence, error = ?e, "Telemetry poll failed");
                    }
                });
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_app, AppSettings};
    use chrono::Utc;
    use dwlr_core::RawRecord;
    use dwlr_ingest::SimulatedSource;

    struct FailingSource;

    #[async_trait::async_trait]
    impl TelemetrySource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self) -> Result<Vec<RawRecord>> {
            anyhow::bail!("connection refused")
        }
    }

    /// Serves the same batch after a fixed delay
    struct DelayedSource {
        delay: Duration,
        records: Vec<RawRecord>,
    }

    #[async_trait::async_trait]
    impl TelemetrySource for DelayedSource {
        fn name(&self) -> &str {
            "delayed"
        }

        async fn fetch(&self) -> Result<Vec<RawRecord>> {
            tokio::time::sleep(self.delay).await;
            Ok(self.records.clone())
        }
    }

    #[tokio::test]
    async fn test_poll_once_applies_snapshot() {
        let (_app, state) = build_app(AppSettings::default()).unwrap();
        let poller = Poller::new(Arc::new(SimulatedSource::new(3, 4)), Duration::from_secs(30));

        assert!(poller.poll_once(&state).await.unwrap());
        assert_eq!(state.sequence().await, Some(1));
        let classified = state.classified(Utc::now()).await.unwrap();
        assert_eq!(classified.len(), 3);

        assert!(poller.poll_once(&state).await.unwrap());
        assert_eq!(state.sequence().await, Some(2));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_snapshot() {
        let (_app, state) = build_app(AppSettings::default()).unwrap();
        let good = Poller::new(Arc::new(SimulatedSource::new(2, 2)), Duration::from_secs(30));
        good.poll_once(&state).await.unwrap();

        let bad = Poller::new(Arc::new(FailingSource), Duration::from_secs(30));
        assert!(bad.poll_once(&state).await.is_err());
        assert_eq!(state.sequence().await, Some(1));
    }

    #[tokio::test]
    async fn test_slow_older_fetch_is_discarded() {
        let (_app, state) = build_app(AppSettings::default()).unwrap();
        let records = SimulatedSource::new(2, 2).generate(Utc::now());

        let slow = Poller::new(
            Arc::new(DelayedSource {
                delay: Duration::from_millis(200),
                records: records.clone(),
            }),
            Duration::from_secs(30),
        );
        let fast = Poller::new(
            Arc::new(DelayedSource {
                delay: Duration::ZERO,
                records,
            }),
            Duration::from_secs(30),
        );

        // Sequence 1 starts first but completes last
        let (older, newer) = tokio::join!(
            slow.fetch_and_apply(&state, 1),
            fast.fetch_and_apply(&state, 2)
        );
        assert!(newer.unwrap());
        assert!(!older.unwrap());
        assert_eq!(state.sequence().await, Some(2));
    }

    #[tokio::test]
    async fn test_spawned_poller_becomes_ready() {
        let (_app, state) = build_app(AppSettings::default()).unwrap();
        let poller = Arc::new(Poller::new(
            Arc::new(SimulatedSource::new(2, 2)),
            Duration::from_millis(20),
        ));
        let handle = Arc::clone(&poller).spawn(Arc::clone(&state));

        let mut waited = Duration::ZERO;
        while state.sequence().await.is_none() && waited < Duration::from_secs(5) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += Duration::from_millis(10);
        }
        handle.abort();
        assert!(state.sequence().await.is_some());
    }
}
