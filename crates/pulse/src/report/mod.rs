//! Report rendering
//!
//! Turns a [`ReportBundle`] into the markdown report, the top-queries chart
//! and the CSV exports of the compared datasets. Undefined values render as `n/a` in markdown and
//! as an empty cell in CSV; empty sections render an explicit marker.

use chrono::{DateTime, Utc};
use pulse_core::{ComparedDataset, Dataset, Insights, PeriodTotals};

use crate::period::ReportPeriod;

pub mod chart;
pub mod export;
pub mod markdown;

/// Marker for a section with nothing to show
pub const NO_DATA: &str = "_No data_";

/// Everything one run produced, ready for rendering
#[derive(Debug, Clone)]
pub struct ReportBundle {
  pub period: ReportPeriod,
  pub previous_period: ReportPeriod,
  pub current_queries: Dataset,
  pub previous_queries: Dataset,
  pub compared_queries: ComparedDataset,
  pub current_pages: Dataset,
  pub previous_pages: Dataset,
  pub compared_pages: ComparedDataset,
  pub current_channels: Dataset,
  pub previous_channels: Dataset,
  pub compared_channels: ComparedDataset,
  pub insights: Insights,
  pub generated_at: DateTime<Utc>,
}

impl ReportBundle {
  pub fn current_totals(&self) -> PeriodTotals {
    PeriodTotals::from_datasets(&self.current_queries, &self.current_channels)
  }

  pub fn previous_totals(&self) -> PeriodTotals {
    PeriodTotals::from_datasets(&self.previous_queries, &self.previous_channels)
  }
}

pub(crate) fn format_number(value: f64) -> String {
  if value.fract() == 0.0 {
    format!("{:.0}", value)
  } else {
    format!("{:.2}", value)
  }
}

pub(crate) fn format_signed(value: f64) -> String {
  if value.fract() == 0.0 {
    format!("{:+.0}", value)
  } else {
    format!("{:+.2}", value)
  }
}

pub(crate) fn format_percent(value: Option<f64>) -> String {
  match value {
    Some(ratio) => format!("{:+.1}%", ratio * 100.0),
    None => "n/a".to_string(),
  }
}

pub(crate) fn format_rate(value: Option<f64>) -> String {
  match value {
    Some(ratio) => format!("{:.2}%", ratio * 100.0),
    None => "n/a".to_string(),
  }
}
