use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::models::telemetry::Sample;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("telemetry request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("telemetry endpoint answered {0}")]
    Status(StatusCode),
    #[error("telemetry document malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Where samples come from.
pub trait TelemetrySource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<Sample, FetchError>>;
}

/// Polls the JSON document the storage system publishes over HTTP.
pub struct HttpTelemetrySource {
    url: String,
    client: Client,
}

impl HttpTelemetrySource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        // every poll must reach the device, never a cache in between
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        let client = Client::builder().timeout(timeout).default_headers(headers).build()?;
        Ok(Self { url: url.into(), client })
    }

    async fn fetch_sample(&self) -> Result<Sample, FetchError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl TelemetrySource for HttpTelemetrySource {
    fn fetch(&self) -> BoxFuture<'_, Result<Sample, FetchError>> {
        Box::pin(self.fetch_sample())
    }
}
