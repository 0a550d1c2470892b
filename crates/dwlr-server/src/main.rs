use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dwlr_config::{AppConfig, SourceKind};
use dwlr_core::TelemetrySource;
use dwlr_ingest::{FileSource, HttpSource, SimulatedSource};
use dwlr_server::{build_app, AppSettings, Poller};
use tokio::net::TcpListener;

/// Readings generated per simulated station (one day at 15 minute spacing)
const SIMULATED_READINGS: usize = 96;

fn build_source(cfg: &AppConfig) -> Result<Arc<dyn TelemetrySource>> {
    let source: Arc<dyn TelemetrySource> = match cfg.source_kind() {
        SourceKind::Http => Arc::new(HttpSource::new(cfg.source_url())?),
        SourceKind::File => {
            let path = cfg
                .source_path()
                .context("source.path is required for file sources")?;
            Arc::new(FileSource::new(path))
        }
        SourceKind::Simulator => Arc::new(SimulatedSource::new(
            cfg.simulated_stations(),
            SIMULATED_READINGS,
        )),
    };
    Ok(source)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Observability
    dwlr_obs::init("dwlr-server");

    // Config
    let cfg = AppConfig::load().context("Failed to load configuration")?;
    let settings = AppSettings {
        classifier: cfg.classifier(),
        trend_window: cfg.trend_window(),
    };

    // Build app and state
    let (app, state) = build_app(settings)?;

    // Start polling in background; readiness flips on the first applied snapshot
    let source = build_source(&cfg)?;
    tracing::info!(source = source.name(), "Telemetry source configured");
    let poller = Poller::new(source, cfg.poll_interval())
        .with_format(cfg.source_format()?)
        .with_default_station_id(cfg.default_station_id());
    let poll_handle = Arc::new(poller).spawn(Arc::clone(&state));

    // Start HTTP server
    let addr: SocketAddr = cfg
        .http_bind()
        .parse()
        .context("Invalid HTTP bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {addr}"))?;

    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    poll_handle.abort();
    tracing::info!("DWLR server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
