use dwlr_ingest::SourceFormat;
use dwlr_status::{AnomalyDetectionPolicy, Classifier, DashboardHealthPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SOURCE_URL: &str = "https://mock-api-jsia.onrender.com/DWLR_DATA";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_TREND_WINDOW: usize = 5;

/// Where telemetry comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Http,
    File,
    Simulator,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: Option<SourceKind>,
    pub url: Option<String>,
    pub path: Option<PathBuf>,
    /// `auto`, `dwlr` or `sensor`
    pub format: Option<String>,
    /// Station id for sensor records that carry none
    pub station_id: Option<String>,
    /// Simulator only
    pub stations: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsConfig {
    pub trend_window: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub dashboard: Option<DashboardHealthPolicy>,
    pub anomaly: Option<AnomalyDetectionPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub source: Option<SourceConfig>,
    pub poll: Option<PollConfig>,
    pub server: Option<ServerConfig>,
    pub stats: Option<StatsConfig>,
    pub policy: Option<PolicyConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl AppConfig {
    /// Load configuration from DWLR_CONFIG path (TOML) if present, with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("DWLR_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(path)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            let s = fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&s)?
        } else {
            AppConfig::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.source_format()?;
        if self.poll_interval().is_zero() {
            return Err(ConfigError::Invalid {
                key: "poll.interval_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        if let Some(dashboard) = self.policy.as_ref().and_then(|p| p.dashboard.as_ref()) {
            if dashboard.offline_after_minutes <= 0 || dashboard.offline_after().is_none() {
                return Err(ConfigError::Invalid {
                    key: "policy.dashboard.offline_after_minutes",
                    message: format!(
                        "{} is not a positive duration in range",
                        dashboard.offline_after_minutes
                    ),
                });
            }
        }
        if self.source_kind() == SourceKind::File && self.source_path().is_none() {
            return Err(ConfigError::Invalid {
                key: "source.path",
                message: "required for file sources".to_string(),
            });
        }
        Ok(())
    }

    fn source_section(&self) -> Option<&SourceConfig> {
        self.source.as_ref()
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_section()
            .and_then(|s| s.kind)
            .unwrap_or_default()
    }

    /// Telemetry endpoint (default: the public DWLR mock API)
    pub fn source_url(&self) -> String {
        self.source_section()
            .and_then(|s| s.url.clone())
            .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string())
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_section().and_then(|s| s.path.as_deref())
    }

    /// Fixed record format, or `None` to detect it per batch
    pub fn source_format(&self) -> Result<Option<SourceFormat>, ConfigError> {
        match self.source_section().and_then(|s| s.format.as_deref()) {
            None | Some("auto") => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|e: dwlr_ingest::IngestError| {
                ConfigError::Invalid {
                    key: "source.format",
                    message: e.to_string(),
                }
            }),
        }
    }

    pub fn default_station_id(&self) -> Option<String> {
        self.source_section().and_then(|s| s.station_id.clone())
    }

    /// Number of simulated stations (default 12)
    pub fn simulated_stations(&self) -> usize {
        self.source_section()
            .and_then(|s| s.stations)
            .unwrap_or(12)
    }

    pub fn poll_interval(&self) -> Duration {
        let secs = self
            .poll
            .as_ref()
            .and_then(|p| p.interval_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    /// Get HTTP bind address (default 0.0.0.0:8080)
    pub fn http_bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
    }

    pub fn trend_window(&self) -> usize {
        self.stats
            .as_ref()
            .and_then(|s| s.trend_window)
            .unwrap_or(DEFAULT_TREND_WINDOW)
    }

    /// Classifier built from the configured policies
    pub fn classifier(&self) -> Classifier {
        let policy = self.policy.clone().unwrap_or_default();
        Classifier::new(
            policy.dashboard.unwrap_or_default(),
            policy.anomaly.unwrap_or_default(),
        )
    }
}
