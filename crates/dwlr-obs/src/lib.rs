use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when RUST_LOG is unset
pub const DEFAULT_FILTER: &str = "info,dwlr=debug";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable, for local runs
    Pretty,
}

impl LogFormat {
    /// `DWLR_LOG_FORMAT=pretty` switches to text output
    pub fn from_env() -> Self {
        match std::env::var("DWLR_LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

fn filter_directives(rust_log: Option<String>) -> String {
    rust_log
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Initialize logging for `service_name`.
/// - JSON logs unless DWLR_LOG_FORMAT=pretty
/// - RUST_LOG respected; default to "info,dwlr=debug"
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init(service_name: &str) {
    let env_filter = EnvFilter::new(filter_directives(std::env::var("RUST_LOG").ok()));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match LogFormat::from_env() {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    if installed.is_ok() {
        tracing::info!(service = %service_name, "Observability initialized");
    }
}
