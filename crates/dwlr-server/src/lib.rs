pub mod poller;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use dwlr_core::{Location, Reading, Station};
use dwlr_ingest::{NormalizeReport, Normalized};
use dwlr_stats::{
    aggregate_with, daily_water_levels, flagged_readings, summarize_readings, AggregateOptions,
    PeriodWindow, QuickFilter, StationQuery, StatsError, DEFAULT_TREND_WINDOW,
};
use dwlr_status::{ClassifiedStation, Classifier, DerivedStatus};
use opentelemetry::metrics::{Counter, MeterProvider};
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

pub use poller::Poller;

const ANOMALY_LIMIT_CAP: usize = 1000;

/// Settings that shape every derived view
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub classifier: Classifier,
    pub trend_window: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            classifier: Classifier::default(),
            trend_window: DEFAULT_TREND_WINDOW,
        }
    }
}

/// The last applied station collection
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub sequence: u64,
    pub applied_at: DateTime<Utc>,
    pub stations: Vec<Station>,
    pub report: NormalizeReport,
}

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    polls_applied: Counter<u64>,
    stale_discarded: Counter<u64>,
    records_skipped: Counter<u64>,
    settings: AppSettings,
    snapshot: RwLock<Option<Snapshot>>,
}

impl AppState {
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Sequence number of the applied snapshot, if any
    pub async fn sequence(&self) -> Option<u64> {
        self.snapshot.read().await.as_ref().map(|s| s.sequence)
    }

    /// Classify the current snapshot at `now`; `None` before the first poll
    pub async fn classified(&self, now: DateTime<Utc>) -> Option<Vec<ClassifiedStation>> {
        let snapshot = self.snapshot.read().await;
        snapshot
            .as_ref()
            .map(|s| self.settings.classifier.classify_all(&s.stations, now))
    }

    fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            trend_window: self.settings.trend_window,
            dashboard: self.settings.classifier.dashboard.clone(),
        }
    }
}

pub fn build_app(settings: AppSettings) -> Result<(Router, Arc<AppState>)> {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter()
        .with_registry(registry.clone())
        .build()
        .context("Failed to build Prometheus exporter")?;
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("dwlr-server");

    let requests_total = meter
        .u64_counter("dwlr_requests_total")
        .with_description("Total HTTP requests served")
        .init();
    let polls_applied = meter
        .u64_counter("dwlr_polls_applied_total")
        .with_description("Telemetry snapshots applied")
        .init();
    let stale_discarded = meter
        .u64_counter("dwlr_stale_responses_total")
        .with_description("Completed fetches discarded as older than the applied snapshot")
        .init();
    let records_skipped = meter
        .u64_counter("dwlr_records_skipped_total")
        .with_description("Malformed raw records dropped during normalization")
        .init();

    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        provider,
        requests_total,
        polls_applied,
        stale_discarded,
        records_skipped,
        settings,
        snapshot: RwLock::new(None),
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/stations", get(list_stations))
        .route("/api/v1/stations/:id", get(station_detail))
        .route("/api/v1/statistics", get(statistics))
        .route("/api/v1/trend", get(trend))
        .route("/api/v1/anomalies", get(anomalies))
        .with_state(Arc::clone(&state));

    Ok((router, state))
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

/// Replace the snapshot with `normalized` unless a newer fetch was already applied.
///
/// Returns whether the snapshot was applied.
pub async fn apply_snapshot(state: &Arc<AppState>, sequence: u64, normalized: Normalized) -> bool {
    let report = normalized.report();
    state.records_skipped.add(report.skipped as u64, &[]);

    let mut current = state.snapshot.write().await;
    if let Some(applied) = current.as_ref() {
        if sequence <= applied.sequence {
            state.stale_discarded.add(1, &[]);
            warn!(
                sequence,
                applied = applied.sequence,
                "Discarding stale telemetry response"
            );
            return false;
        }
    }

    *current = Some(Snapshot {
        sequence,
        applied_at: Utc::now(),
        stations: normalized.stations,
        report,
    });
    drop(current);

    state.polls_applied.add(1, &[]);
    set_ready(state, true);
    info!(
        sequence,
        stations = report.stations,
        readings = report.readings,
        skipped = report.skipped,
        "Applied telemetry snapshot"
    );
    true
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    state.requests_total.add(1, &[]);
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(
    State(state): State<Arc<AppState>>,
) -> (
    [(axum::http::header::HeaderName, axum::http::HeaderValue); 1],
    String,
) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}

/// `?state=&search=&filter=` as sent by the dashboards
#[derive(Debug, Deserialize)]
struct StationParams {
    state: Option<String>,
    search: Option<String>,
    filter: Option<String>,
}

impl StationParams {
    fn into_query(self) -> Result<StationQuery, StatsError> {
        let filter = match self.filter.as_deref() {
            Some(raw) => raw.parse()?,
            None => QuickFilter::All,
        };
        Ok(StationQuery {
            state: self.state,
            search: self.search,
            filter,
        })
    }
}

fn bad_request(error: impl std::fmt::Display) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": error.to_string() })),
    )
        .into_response()
}

/// Classified stations matching `params`, or the response to send instead
async fn matching_stations(
    state: &Arc<AppState>,
    params: StationParams,
) -> Result<Vec<ClassifiedStation>, Response> {
    state.requests_total.add(1, &[]);
    let query = params.into_query().map_err(bad_request)?;
    let classified = state
        .classified(Utc::now())
        .await
        .ok_or_else(|| StatusCode::NO_CONTENT.into_response())?;
    if query.is_empty() {
        return Ok(classified);
    }
    Ok(query.apply(&classified, &state.settings.classifier.dashboard))
}

#[derive(Serialize)]
struct StationView<'a> {
    id: &'a str,
    location: &'a Location,
    latest: Option<&'a Reading>,
    readings: usize,
    status: &'a DerivedStatus,
}

impl<'a> From<&'a ClassifiedStation> for StationView<'a> {
    fn from(c: &'a ClassifiedStation) -> Self {
        Self {
            id: c.station.id(),
            location: c.station.location(),
            latest: c.station.latest(),
            readings: c.station.len(),
            status: &c.status,
        }
    }
}

async fn list_stations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StationParams>,
) -> Response {
    match matching_stations(&state, params).await {
        Ok(stations) => {
            let views: Vec<StationView> = stations.iter().map(StationView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(response) => response,
    }
}

async fn station_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    state.requests_total.add(1, &[]);
    let snapshot = state.snapshot.read().await;
    let Some(station) = snapshot
        .as_ref()
        .and_then(|s| s.stations.iter().find(|st| st.id() == id))
    else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let classifier = &state.settings.classifier;
    let status = classifier.classify(station, Utc::now());
    let summary = summarize_readings(
        station.readings(),
        classifier,
        PeriodWindow::new(state.settings.trend_window),
    );
    let body = serde_json::json!({
        "station": station,
        "status": status,
        "summary": summary,
    });
    (StatusCode::OK, Json(body)).into_response()
}

async fn statistics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StationParams>,
) -> Response {
    match matching_stations(&state, params).await {
        Ok(stations) => {
            let stats = aggregate_with(&stations, &state.aggregate_options());
            (StatusCode::OK, Json(stats)).into_response()
        }
        Err(response) => response,
    }
}

async fn trend(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StationParams>,
) -> Response {
    match matching_stations(&state, params).await {
        Ok(stations) => {
            let daily = daily_water_levels(stations.iter().map(|c| &c.station));
            (StatusCode::OK, Json(daily)).into_response()
        }
        Err(response) => response,
    }
}

#[derive(Debug, Deserialize)]
struct AnomalyParams {
    limit: Option<usize>,
}

async fn anomalies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AnomalyParams>,
) -> Response {
    state.requests_total.add(1, &[]);
    let limit = q.limit.unwrap_or(100).min(ANOMALY_LIMIT_CAP);
    let snapshot = state.snapshot.read().await;
    let Some(current) = snapshot.as_ref() else {
        return StatusCode::NO_CONTENT.into_response();
    };
    let mut flagged = flagged_readings(&current.stations, &state.settings.classifier);
    flagged.truncate(limit);
    (StatusCode::OK, Json(flagged)).into_response()
}
