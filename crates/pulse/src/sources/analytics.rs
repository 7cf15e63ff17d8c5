use async_trait::async_trait;
use pulse_core::{Dataset, MetricRecord};
use serde::{Deserialize, Serialize};

use super::{ApiClient, ChannelSource, SourceError};
use crate::period::ReportPeriod;

pub const DEFAULT_BASE_URL: &str = "https://analyticsdata.googleapis.com";

const CHANNEL_DIMENSION: &str = "sessionDefaultChannelGroup";
const METRICS: [&str; 2] = ["sessions", "totalUsers"];

/// GA4 Data API client reporting sessions and users per default channel group
pub struct AnalyticsClient {
  api: ApiClient,
  property_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReportRequest {
  date_ranges: Vec<DateRange>,
  dimensions: Vec<Named>,
  metrics: Vec<Named>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DateRange {
  start_date: String,
  end_date: String,
}

#[derive(Debug, Serialize)]
struct Named {
  name: &'static str,
}

#[derive(Debug, Deserialize)]
struct RunReportResponse {
  #[serde(default)]
  rows: Vec<ReportRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
  #[serde(default)]
  dimension_values: Vec<ReportValue>,
  #[serde(default)]
  metric_values: Vec<ReportValue>,
}

#[derive(Debug, Deserialize)]
struct ReportValue {
  #[serde(default)]
  value: String,
}

impl AnalyticsClient {
  pub fn new(property_id: impl Into<String>, access_token: impl Into<String>) -> Self {
    Self::with_base_url(DEFAULT_BASE_URL, property_id, access_token)
  }

  pub fn with_base_url(
    base_url: impl Into<String>,
    property_id: impl Into<String>,
    access_token: impl Into<String>,
  ) -> Self {
    Self { api: ApiClient::new(base_url, access_token), property_id: property_id.into() }
  }

  fn metric(&self, row: &ReportRow, index: usize) -> Result<f64, SourceError> {
    let Some(value) = row.metric_values.get(index) else {
      return Ok(0.0);
    };
    value.value.parse::<f64>().map_err(|e| SourceError::Decode {
      endpoint: self.api.base_url().to_string(),
      message: format!("metric '{}' has non-numeric value '{}': {}", METRICS[index], value.value, e),
    })
  }
}

#[async_trait]
impl ChannelSource for AnalyticsClient {
  async fn fetch_channels(&self, period: &ReportPeriod) -> Result<Dataset, SourceError> {
    let resource = format!("{}:runReport", self.property_id);
    let url = self.api.endpoint(&["v1beta", "properties", resource.as_str()])?;
    let request = RunReportRequest {
      date_ranges: vec![DateRange { start_date: period.start_str(), end_date: period.end_str() }],
      dimensions: vec![Named { name: CHANNEL_DIMENSION }],
      metrics: METRICS.into_iter().map(|name| Named { name }).collect(),
    };

    let response: RunReportResponse = self.api.post_json(url, &request).await?;
    tracing::info!(property = %self.property_id, %period, rows = response.rows.len(), "fetched GA4 channels");

    let mut records = Vec::with_capacity(response.rows.len());
    for row in &response.rows {
      let channel = row.dimension_values.first().map(|v| v.value.clone()).unwrap_or_default();
      records.push(MetricRecord::channel(channel, self.metric(row, 0)?, self.metric(row, 1)?));
    }
    let dataset = Dataset::channels().with_records(records);

    Ok(dataset.sorted_by(pulse_core::fields::SESSIONS))
  }
}
