//! Reducers over datasets
//!
//! Every function here is total: a zero denominator or an empty input
//! yields `None` instead of a panic, an infinity, or a silent zero.

use crate::dataset::{fields, Dataset};

/// Arithmetic sum of `field`; zero for an empty dataset
pub fn sum(dataset: &Dataset, field: &str) -> f64 {
  dataset.iter().map(|record| record.value(field)).sum()
}

/// `numerator / denominator`, or `None` when the denominator is zero
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
  if denominator == 0.0 {
    None
  } else {
    Some(numerator / denominator)
  }
}

/// Relative change from `previous` to `current`; `None` without a baseline
pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
  safe_ratio(current - previous, previous)
}

/// Mean of `value_field` weighted by `weight_field`
///
/// When the total weight is zero the unweighted mean over records that
/// carry `value_field` is used instead, so rows with zero impressions still
/// produce an average position. `None` when no record carries a value.
pub fn weighted_average(dataset: &Dataset, value_field: &str, weight_field: &str) -> Option<f64> {
  let total_weight = sum(dataset, weight_field);
  if total_weight != 0.0 {
    let weighted: f64 =
      dataset.iter().map(|record| record.value(value_field) * record.value(weight_field)).sum();
    return Some(weighted / total_weight);
  }

  let values: Vec<f64> = dataset.iter().filter_map(|record| record.get(value_field)).collect();
  safe_ratio(values.iter().sum(), values.len() as f64)
}

/// Headline numbers for one period across both metric families
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeriodTotals {
  pub clicks: f64,
  pub impressions: f64,
  pub click_through_rate: Option<f64>,
  pub average_position: Option<f64>,
  pub sessions: f64,
  pub total_users: f64,
}

impl PeriodTotals {
  pub fn from_datasets(queries: &Dataset, channels: &Dataset) -> Self {
    let clicks = sum(queries, fields::CLICKS);
    let impressions = sum(queries, fields::IMPRESSIONS);

    Self {
      clicks,
      impressions,
      click_through_rate: safe_ratio(clicks, impressions),
      average_position: weighted_average(queries, fields::AVERAGE_POSITION, fields::IMPRESSIONS),
      sessions: sum(channels, fields::SESSIONS),
      total_users: sum(channels, fields::TOTAL_USERS),
    }
  }
}
