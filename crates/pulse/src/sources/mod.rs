//! Data sources for the weekly report
//!
//! Each source maps its own row shape onto [`pulse_core::MetricRecord`] and
//! hands back a [`Dataset`] per reporting period. Authentication and row
//! limits are the source's concern; the pipeline only sees datasets.

use async_trait::async_trait;
use pulse_core::Dataset;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

use crate::period::ReportPeriod;

pub mod analytics;
pub mod archive;
pub mod search_console;

pub use analytics::AnalyticsClient;
pub use archive::CsvArchive;
pub use search_console::SearchConsoleClient;

#[derive(Error, Debug)]
pub enum SourceError {
  #[error("Invalid endpoint '{endpoint}'")]
  InvalidEndpoint { endpoint: String },

  #[error("Request to {endpoint} failed: {source}")]
  Http {
    endpoint: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("{endpoint} returned HTTP {status}: {body}")]
  Status { endpoint: String, status: u16, body: String },

  #[error("Could not decode response from {endpoint}: {message}")]
  Decode { endpoint: String, message: String },

  #[error("CSV error in {path}: {source}")]
  Csv {
    path: PathBuf,
    #[source]
    source: csv::Error,
  },

  #[error("I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Source of search-performance datasets, broken down by query and by page
#[async_trait]
pub trait QuerySource: Send + Sync {
  async fn fetch_queries(&self, period: &ReportPeriod) -> Result<Dataset, SourceError>;

  async fn fetch_pages(&self, period: &ReportPeriod) -> Result<Dataset, SourceError>;
}

/// Source of traffic-channel datasets
#[async_trait]
pub trait ChannelSource: Send + Sync {
  async fn fetch_channels(&self, period: &ReportPeriod) -> Result<Dataset, SourceError>;
}

/// Bearer-authenticated JSON client shared by the Google API sources
#[derive(Debug, Clone)]
pub struct ApiClient {
  client: reqwest::Client,
  base_url: String,
  access_token: String,
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
    Self { client: reqwest::Client::new(), base_url: base_url.into(), access_token: access_token.into() }
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Base URL extended with `segments`, each percent-encoded as one path segment
  pub fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError> {
    let invalid = || SourceError::InvalidEndpoint { endpoint: self.base_url.clone() };
    let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
    url.path_segments_mut().map_err(|_| invalid())?.pop_if_empty().extend(segments);
    Ok(url)
  }

  pub async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, SourceError>
  where
    B: Serialize + Sync,
    T: DeserializeOwned,
  {
    let endpoint = url.to_string();
    tracing::debug!(%endpoint, "POST");

    let response = self
      .client
      .post(url)
      .bearer_auth(&self.access_token)
      .json(body)
      .send()
      .await
      .map_err(|source| SourceError::Http { endpoint: endpoint.clone(), source })?;

    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|source| SourceError::Http { endpoint: endpoint.clone(), source })?;

    if !status.is_success() {
      return Err(SourceError::Status { endpoint, status: status.as_u16(), body: text });
    }

    serde_json::from_str(&text).map_err(|e| SourceError::Decode { endpoint, message: e.to_string() })
  }
}
