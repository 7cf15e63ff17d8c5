//! Keyed metric records and the datasets built from them
//!
//! Both data sources map their rows onto [`MetricRecord`]: one record per
//! dimension value (a search query or a traffic channel) carrying a set of
//! named numeric fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field names shared by the sources, the comparator and the renderer
pub mod fields {
  pub const CLICKS: &str = "clicks";
  pub const IMPRESSIONS: &str = "impressions";
  pub const CLICK_THROUGH_RATE: &str = "click_through_rate";
  pub const AVERAGE_POSITION: &str = "average_position";
  pub const SESSIONS: &str = "sessions";
  pub const TOTAL_USERS: &str = "total_users";

  pub const QUERY_METRICS: [&str; 4] = [CLICKS, IMPRESSIONS, CLICK_THROUGH_RATE, AVERAGE_POSITION];
  pub const CHANNEL_METRICS: [&str; 2] = [SESSIONS, TOTAL_USERS];

  pub const QUERY_DIMENSION: &str = "query";
  pub const PAGE_DIMENSION: &str = "page";
  pub const CHANNEL_DIMENSION: &str = "channel_group";
}

/// Metrics for a single dimension value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
  pub key: String,
  values: BTreeMap<String, f64>,
}

impl MetricRecord {
  pub fn new(key: impl Into<String>) -> Self {
    Self { key: key.into(), values: BTreeMap::new() }
  }

  /// Search-performance record as reported by Search Console, keyed by query or page
  pub fn query(
    key: impl Into<String>,
    clicks: f64,
    impressions: f64,
    click_through_rate: f64,
    average_position: f64,
  ) -> Self {
    Self::new(key)
      .with_value(fields::CLICKS, clicks)
      .with_value(fields::IMPRESSIONS, impressions)
      .with_value(fields::CLICK_THROUGH_RATE, click_through_rate)
      .with_value(fields::AVERAGE_POSITION, average_position)
  }

  /// Channel-performance record as reported by GA4
  pub fn channel(key: impl Into<String>, sessions: f64, total_users: f64) -> Self {
    Self::new(key)
      .with_value(fields::SESSIONS, sessions)
      .with_value(fields::TOTAL_USERS, total_users)
  }

  pub fn with_value(mut self, field: &str, value: f64) -> Self {
    self.set(field, value);
    self
  }

  pub fn set(&mut self, field: &str, value: f64) {
    self.values.insert(field.to_string(), value);
  }

  /// Value of `field`, or `None` when the record never carried it
  pub fn get(&self, field: &str) -> Option<f64> {
    self.values.get(field).copied()
  }

  /// Value of `field` for aggregation purposes; absent reads as zero
  pub fn value(&self, field: &str) -> f64 {
    self.get(field).unwrap_or(0.0)
  }

  pub fn fields(&self) -> impl Iterator<Item = (&str, f64)> {
    self.values.iter().map(|(name, value)| (name.as_str(), *value))
  }
}

/// Ordered collection of records sharing one schema
///
/// Keys are unique within a dataset; that is the upstream source's
/// contract and is not re-validated here. An empty dataset means "no data
/// for this period".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
  pub dimension: String,
  pub records: Vec<MetricRecord>,
}

impl Dataset {
  pub fn new(dimension: impl Into<String>) -> Self {
    Self { dimension: dimension.into(), records: Vec::new() }
  }

  pub fn queries() -> Self {
    Self::new(fields::QUERY_DIMENSION)
  }

  pub fn pages() -> Self {
    Self::new(fields::PAGE_DIMENSION)
  }

  pub fn channels() -> Self {
    Self::new(fields::CHANNEL_DIMENSION)
  }

  pub fn with_records(mut self, records: Vec<MetricRecord>) -> Self {
    self.records = records;
    self
  }

  pub fn push(&mut self, record: MetricRecord) {
    self.records.push(record);
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, MetricRecord> {
    self.records.iter()
  }

  pub fn get(&self, key: &str) -> Option<&MetricRecord> {
    self.records.iter().find(|record| record.key == key)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.records.iter().map(|record| record.key.as_str())
  }

  /// Records ordered by `field`, highest first; equal values keep input order
  pub fn sorted_by(&self, field: &str) -> Dataset {
    let mut records = self.records.clone();
    records.sort_by(|a, b| b.value(field).total_cmp(&a.value(field)));
    Dataset { dimension: self.dimension.clone(), records }
  }
}

impl<'a> IntoIterator for &'a Dataset {
  type Item = &'a MetricRecord;
  type IntoIter = std::slice::Iter<'a, MetricRecord>;

  fn into_iter(self) -> Self::IntoIter {
    self.records.iter()
  }
}

/// One metric of one record, compared against the previous period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricChange {
  pub current: f64,
  /// Matching previous-period value; `None` when there was no baseline
  pub previous: Option<f64>,
  /// `current - previous`, with a missing baseline read as zero
  pub delta: f64,
  /// `delta / previous`; `None` when the baseline is missing or zero
  pub percent_change: Option<f64>,
}

/// A current-period record extended with its per-metric changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparedRecord {
  pub key: String,
  pub current: MetricRecord,
  pub changes: Vec<(String, MetricChange)>,
}

impl ComparedRecord {
  pub fn change(&self, metric: &str) -> Option<&MetricChange> {
    self.changes.iter().find(|(name, _)| name == metric).map(|(_, change)| change)
  }

  pub fn delta(&self, metric: &str) -> Option<f64> {
    self.change(metric).map(|change| change.delta)
  }
}

/// Result of joining a current dataset against its previous period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparedDataset {
  pub dimension: String,
  pub metrics: Vec<String>,
  pub records: Vec<ComparedRecord>,
}

impl ComparedDataset {
  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, ComparedRecord> {
    self.records.iter()
  }

  pub fn get(&self, key: &str) -> Option<&ComparedRecord> {
    self.records.iter().find(|record| record.key == key)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_absent_field_reads_as_zero() {
    let record = MetricRecord::new("shoes").with_value(fields::CLICKS, 12.0);
    assert_eq!(record.get(fields::CLICKS), Some(12.0));
    assert_eq!(record.get(fields::IMPRESSIONS), None);
    assert_eq!(record.value(fields::IMPRESSIONS), 0.0);
  }

  #[test]
  fn test_sorted_by_is_stable_and_descending() {
    let dataset = Dataset::queries().with_records(vec![
      MetricRecord::query("a", 5.0, 10.0, 0.5, 1.0),
      MetricRecord::query("b", 9.0, 10.0, 0.9, 1.0),
      MetricRecord::query("c", 5.0, 10.0, 0.5, 1.0),
    ]);

    let sorted = dataset.sorted_by(fields::CLICKS);
    let order: Vec<&str> = sorted.keys().collect();
    assert_eq!(order, vec!["b", "a", "c"]);
  }

  #[test]
  fn test_lookup_by_key() {
    let dataset = Dataset::channels().with_records(vec![
      MetricRecord::channel("Direct", 40.0, 30.0),
      MetricRecord::channel("Organic Search", 80.0, 60.0),
    ]);

    assert_eq!(dataset.get("Organic Search").map(|r| r.value(fields::SESSIONS)), Some(80.0));
    assert!(dataset.get("Referral").is_none());
    assert_eq!(dataset.dimension, fields::CHANNEL_DIMENSION);
  }
}
