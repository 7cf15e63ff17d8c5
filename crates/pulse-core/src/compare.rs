//! Period-over-period comparison
//!
//! A left join anchored on the current period: every current record appears
//! exactly once in the output, in input order, and records that only exist
//! in the previous period are dropped.

use std::collections::HashMap;

use crate::aggregate::safe_ratio;
use crate::dataset::{ComparedDataset, ComparedRecord, Dataset, MetricChange, MetricRecord};

/// Join `current` against `previous` on record key and derive per-metric changes
///
/// The join key is always [`MetricRecord::key`]; which dimension that key
/// holds (query, page or channel) is named by [`Dataset::dimension`], so
/// there is no separate key-field argument.
pub fn compare(current: &Dataset, previous: Option<&Dataset>, metrics: &[&str]) -> ComparedDataset {
  let mut compared = ComparedDataset {
    dimension: current.dimension.clone(),
    metrics: metrics.iter().map(|metric| metric.to_string()).collect(),
    records: Vec::with_capacity(current.len()),
  };

  if current.is_empty() {
    return compared;
  }

  let baseline: HashMap<&str, &MetricRecord> = previous
    .map(|dataset| dataset.iter().map(|record| (record.key.as_str(), record)).collect())
    .unwrap_or_default();

  let mut matched = 0usize;
  for record in current {
    let previous_record = baseline.get(record.key.as_str()).copied();
    if previous_record.is_some() {
      matched += 1;
    }

    let changes = metrics
      .iter()
      .map(|metric| (metric.to_string(), metric_change(record, previous_record, metric)))
      .collect();

    compared.records.push(ComparedRecord {
      key: record.key.clone(),
      current: record.clone(),
      changes,
    });
  }

  tracing::debug!(
    dimension = %current.dimension,
    records = current.len(),
    matched,
    unmatched = current.len() - matched,
    "compared period datasets"
  );

  compared
}

fn metric_change(current: &MetricRecord, previous: Option<&MetricRecord>, metric: &str) -> MetricChange {
  let value = current.value(metric);
  // A matched record without the field has a zero baseline, not a missing one
  let baseline = previous.map(|record| record.value(metric));
  let delta = value - baseline.unwrap_or(0.0);

  MetricChange {
    current: value,
    previous: baseline,
    delta,
    percent_change: baseline.and_then(|base| safe_ratio(delta, base)),
  }
}
