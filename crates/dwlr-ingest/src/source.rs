//! Telemetry sources: remote JSON endpoint and local JSON file

use anyhow::{Context, Result};
use dwlr_core::{RawRecord, TelemetrySource};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::parse_records;

/// Fetches the full dataset from an HTTP endpoint returning a JSON array
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl TelemetrySource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.url))?
            .error_for_status()
            .with_context(|| format!("Telemetry endpoint {} returned an error", self.url))?;
        let body = response
            .bytes()
            .await
            .context("Failed to read telemetry response body")?;
        debug!(url = %self.url, bytes = body.len(), "Fetched telemetry payload");
        Ok(parse_records(&body)?)
    }
}

/// Reads the dataset from a JSON file on every fetch
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl TelemetrySource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let payload = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        Ok(parse_records(&payload)?)
    }
}
