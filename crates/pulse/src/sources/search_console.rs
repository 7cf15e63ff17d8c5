use async_trait::async_trait;
use pulse_core::{fields, Dataset, MetricRecord};
use serde::{Deserialize, Serialize};

use super::{ApiClient, QuerySource, SourceError};
use crate::period::ReportPeriod;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

/// Search Console search-analytics client, one row per query or page
pub struct SearchConsoleClient {
  api: ApiClient,
  site_url: String,
  row_limit: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchAnalyticsRequest<'a> {
  start_date: String,
  end_date: String,
  dimensions: [&'a str; 1],
  row_limit: u32,
}

#[derive(Debug, Deserialize)]
struct SearchAnalyticsResponse {
  #[serde(default)]
  rows: Vec<SearchAnalyticsRow>,
}

#[derive(Debug, Deserialize)]
struct SearchAnalyticsRow {
  #[serde(default)]
  keys: Vec<String>,
  #[serde(default)]
  clicks: f64,
  #[serde(default)]
  impressions: f64,
  #[serde(default)]
  ctr: f64,
  #[serde(default)]
  position: f64,
}

impl SearchConsoleClient {
  pub fn new(site_url: impl Into<String>, access_token: impl Into<String>, row_limit: u32) -> Self {
    Self::with_base_url(DEFAULT_BASE_URL, site_url, access_token, row_limit)
  }

  pub fn with_base_url(
    base_url: impl Into<String>,
    site_url: impl Into<String>,
    access_token: impl Into<String>,
    row_limit: u32,
  ) -> Self {
    Self { api: ApiClient::new(base_url, access_token), site_url: site_url.into(), row_limit }
  }
}

impl SearchConsoleClient {
  /// One search-analytics breakdown over `dimension`, busiest rows first
  async fn search_analytics(&self, period: &ReportPeriod, dimension: &str) -> Result<Dataset, SourceError> {
    let url =
      self.api.endpoint(&["webmasters", "v3", "sites", self.site_url.as_str(), "searchAnalytics", "query"])?;
    let request = SearchAnalyticsRequest {
      start_date: period.start_str(),
      end_date: period.end_str(),
      dimensions: [dimension],
      row_limit: self.row_limit,
    };

    let response: SearchAnalyticsResponse = self.api.post_json(url, &request).await?;
    tracing::info!(site = %self.site_url, %period, dimension, rows = response.rows.len(), "fetched Search Console rows");

    let mut rows = response.rows;
    rows.sort_by(|a, b| b.clicks.total_cmp(&a.clicks).then(b.impressions.total_cmp(&a.impressions)));

    let records = rows
      .into_iter()
      .map(|row| {
        let key = row.keys.into_iter().next().unwrap_or_default();
        MetricRecord::query(key, row.clicks, row.impressions, row.ctr, row.position)
      })
      .collect();
    Ok(Dataset::new(dimension).with_records(records))
  }
}

#[async_trait]
impl QuerySource for SearchConsoleClient {
  async fn fetch_queries(&self, period: &ReportPeriod) -> Result<Dataset, SourceError> {
    self.search_analytics(period, fields::QUERY_DIMENSION).await
  }

  async fn fetch_pages(&self, period: &ReportPeriod) -> Result<Dataset, SourceError> {
    self.search_analytics(period, fields::PAGE_DIMENSION).await
  }
}
