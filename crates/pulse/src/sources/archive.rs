//! Flat CSV archive of raw datasets
//!
//! Each run stores the datasets it fetched as `queries_<label>.csv`,
//! `pages_<label>.csv` and `channels_<label>.csv`. Reading the archive back
//! is the offline data source: a missing file simply means there is no data
//! for that period.

use async_trait::async_trait;
use pulse_core::{fields, Dataset, MetricRecord};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{ChannelSource, QuerySource, SourceError};
use crate::period::ReportPeriod;

#[derive(Debug, Serialize, Deserialize)]
struct QueryRow {
  query: String,
  #[serde(default)]
  clicks: f64,
  #[serde(default)]
  impressions: f64,
  #[serde(default)]
  ctr: f64,
  #[serde(default)]
  position: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PageRow {
  page: String,
  #[serde(default)]
  clicks: f64,
  #[serde(default)]
  impressions: f64,
  #[serde(default)]
  ctr: f64,
  #[serde(default)]
  position: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChannelRow {
  channel_group: String,
  #[serde(default)]
  sessions: f64,
  #[serde(default)]
  total_users: f64,
}

#[derive(Debug, Clone)]
pub struct CsvArchive {
  dir: PathBuf,
}

impl CsvArchive {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn queries_path(&self, period: &ReportPeriod) -> PathBuf {
    self.dir.join(format!("queries_{}.csv", period.label()))
  }

  pub fn pages_path(&self, period: &ReportPeriod) -> PathBuf {
    self.dir.join(format!("pages_{}.csv", period.label()))
  }

  pub fn channels_path(&self, period: &ReportPeriod) -> PathBuf {
    self.dir.join(format!("channels_{}.csv", period.label()))
  }

  pub fn read_queries(&self, period: &ReportPeriod) -> Result<Dataset, SourceError> {
    let rows: Vec<QueryRow> = read_rows(&self.queries_path(period))?;
    let records = rows
      .into_iter()
      .map(|row| MetricRecord::query(row.query, row.clicks, row.impressions, row.ctr, row.position))
      .collect();
    Ok(Dataset::queries().with_records(records))
  }

  pub fn read_pages(&self, period: &ReportPeriod) -> Result<Dataset, SourceError> {
    let rows: Vec<PageRow> = read_rows(&self.pages_path(period))?;
    let records = rows
      .into_iter()
      .map(|row| MetricRecord::query(row.page, row.clicks, row.impressions, row.ctr, row.position))
      .collect();
    Ok(Dataset::pages().with_records(records))
  }

  pub fn read_channels(&self, period: &ReportPeriod) -> Result<Dataset, SourceError> {
    let rows: Vec<ChannelRow> = read_rows(&self.channels_path(period))?;
    let records = rows
      .into_iter()
      .map(|row| MetricRecord::channel(row.channel_group, row.sessions, row.total_users))
      .collect();
    Ok(Dataset::channels().with_records(records))
  }

  pub fn write_queries(&self, period: &ReportPeriod, dataset: &Dataset) -> Result<PathBuf, SourceError> {
    let rows = dataset.iter().map(|record| QueryRow {
      query: record.key.clone(),
      clicks: record.value(fields::CLICKS),
      impressions: record.value(fields::IMPRESSIONS),
      ctr: record.value(fields::CLICK_THROUGH_RATE),
      position: record.value(fields::AVERAGE_POSITION),
    });
    self.write_rows(self.queries_path(period), rows)
  }

  pub fn write_pages(&self, period: &ReportPeriod, dataset: &Dataset) -> Result<PathBuf, SourceError> {
    let rows = dataset.iter().map(|record| PageRow {
      page: record.key.clone(),
      clicks: record.value(fields::CLICKS),
      impressions: record.value(fields::IMPRESSIONS),
      ctr: record.value(fields::CLICK_THROUGH_RATE),
      position: record.value(fields::AVERAGE_POSITION),
    });
    self.write_rows(self.pages_path(period), rows)
  }

  pub fn write_channels(&self, period: &ReportPeriod, dataset: &Dataset) -> Result<PathBuf, SourceError> {
    let rows = dataset.iter().map(|record| ChannelRow {
      channel_group: record.key.clone(),
      sessions: record.value(fields::SESSIONS),
      total_users: record.value(fields::TOTAL_USERS),
    });
    self.write_rows(self.channels_path(period), rows)
  }

  fn write_rows<R: Serialize>(
    &self,
    path: PathBuf,
    rows: impl Iterator<Item = R>,
  ) -> Result<PathBuf, SourceError> {
    std::fs::create_dir_all(&self.dir)
      .map_err(|source| SourceError::Io { path: self.dir.clone(), source })?;

    let csv_error = |source| SourceError::Csv { path: path.clone(), source };
    let mut writer = csv::Writer::from_path(&path).map_err(csv_error)?;
    for row in rows {
      writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| SourceError::Io { path: path.clone(), source })?;

    Ok(path)
  }
}

fn read_rows<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>, SourceError> {
  if !path.exists() {
    tracing::warn!(path = %path.display(), "no archived data for period");
    return Ok(Vec::new());
  }

  let csv_error = |source| SourceError::Csv { path: path.to_path_buf(), source };
  let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
  reader.deserialize().collect::<Result<Vec<R>, csv::Error>>().map_err(csv_error)
}

#[async_trait]
impl QuerySource for CsvArchive {
  async fn fetch_queries(&self, period: &ReportPeriod) -> Result<Dataset, SourceError> {
    self.read_queries(period)
  }

  async fn fetch_pages(&self, period: &ReportPeriod) -> Result<Dataset, SourceError> {
    self.read_pages(period)
  }
}

#[async_trait]
impl ChannelSource for CsvArchive {
  async fn fetch_channels(&self, period: &ReportPeriod) -> Result<Dataset, SourceError> {
    self.read_channels(period)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn week() -> ReportPeriod {
    ReportPeriod::parse("2024-06-03", "2024-06-09").unwrap()
  }

  #[test]
  fn test_missing_file_is_empty_dataset() {
    let temp_dir = TempDir::new().unwrap();
    let archive = CsvArchive::new(temp_dir.path());

    let queries = archive.read_queries(&week()).unwrap();
    assert!(queries.is_empty());
    assert_eq!(queries.dimension, fields::QUERY_DIMENSION);
    assert!(archive.read_channels(&week()).unwrap().is_empty());
  }

  #[test]
  fn test_written_queries_read_back() {
    let temp_dir = TempDir::new().unwrap();
    let archive = CsvArchive::new(temp_dir.path().join("data"));
    let dataset = Dataset::queries().with_records(vec![
      MetricRecord::query("running shoes", 120.0, 2400.0, 0.05, 4.2),
      MetricRecord::query("trail, boots", 8.0, 300.0, 0.0267, 11.5),
    ]);

    let path = archive.write_queries(&week(), &dataset).unwrap();
    assert!(path.ends_with("queries_2024-06-03_to_2024-06-09.csv"));
    assert_eq!(archive.read_queries(&week()).unwrap(), dataset);
  }

  #[test]
  fn test_reads_hand_written_channel_file() {
    let temp_dir = TempDir::new().unwrap();
    let archive = CsvArchive::new(temp_dir.path());
    std::fs::write(
      archive.channels_path(&week()),
      "channel_group,sessions,total_users\nOrganic Search,80,60\nDirect,20,18\n",
    )
    .unwrap();

    let channels = archive.read_channels(&week()).unwrap();
    assert_eq!(channels.len(), 2);
    assert_eq!(channels.get("Organic Search").unwrap().value(fields::SESSIONS), 80.0);
    assert_eq!(channels.get("Direct").unwrap().value(fields::TOTAL_USERS), 18.0);
  }

  #[test]
  fn test_malformed_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let archive = CsvArchive::new(temp_dir.path());
    std::fs::write(archive.queries_path(&week()), "query,clicks\nshoes,lots\n").unwrap();

    assert!(matches!(archive.read_queries(&week()), Err(SourceError::Csv { .. })));
  }

  #[test]
  fn test_pages_round_trip_through_archive() {
    let temp_dir = TempDir::new().unwrap();
    let archive = CsvArchive::new(temp_dir.path());
    let dataset = Dataset::pages()
      .with_records(vec![MetricRecord::query("https://example.com/shoes", 90.0, 1800.0, 0.05, 3.1)]);

    let path = archive.write_pages(&week(), &dataset).unwrap();
    assert!(path.ends_with("pages_2024-06-03_to_2024-06-09.csv"));
    assert!(std::fs::read_to_string(&path).unwrap().starts_with("page,clicks,impressions,ctr,position"));
    assert_eq!(archive.read_pages(&week()).unwrap(), dataset);
  }
}
