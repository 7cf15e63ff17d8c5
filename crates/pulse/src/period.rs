//! Reporting periods
//!
//! A report compares one inclusive date range against the range of the
//! same length immediately before it.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum PeriodError {
  #[error("Invalid date '{value}', expected YYYY-MM-DD: {source}")]
  InvalidDate {
    value: String,
    #[source]
    source: chrono::ParseError,
  },

  #[error("Period ends ({end}) before it starts ({start})")]
  Inverted { start: NaiveDate, end: NaiveDate },

  #[error("Both a start and an end date are required when either is given")]
  Incomplete,
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

impl ReportPeriod {
  pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PeriodError> {
    if end < start {
      return Err(PeriodError::Inverted { start, end });
    }
    Ok(Self { start, end })
  }

  pub fn parse(start: &str, end: &str) -> Result<Self, PeriodError> {
    Self::new(parse_date(start)?, parse_date(end)?)
  }

  /// Explicit dates when both are given, otherwise the last full week before `today`
  pub fn resolve(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> Result<Self, PeriodError> {
    match (start, end) {
      (Some(start), Some(end)) => Self::parse(start, end),
      (None, None) => Ok(Self::last_full_week(today)),
      _ => Err(PeriodError::Incomplete),
    }
  }

  /// Most recent complete Monday–Sunday week strictly before `today`'s week
  pub fn last_full_week(today: NaiveDate) -> Self {
    let this_monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    Self { start: this_monday - Duration::days(7), end: this_monday - Duration::days(1) }
  }

  /// Number of days covered, both ends included
  pub fn days(&self) -> i64 {
    (self.end - self.start).num_days() + 1
  }

  /// The adjacent period of the same length that ends the day before this one starts
  pub fn previous(&self) -> Self {
    let length = Duration::days(self.days());
    Self { start: self.start - length, end: self.end - length }
  }

  /// File-name friendly label, e.g. `2024-06-03_to_2024-06-09`
  pub fn label(&self) -> String {
    format!("{}_to_{}", self.start_str(), self.end_str())
  }

  pub fn start_str(&self) -> String {
    self.start.format(DATE_FORMAT).to_string()
  }

  pub fn end_str(&self) -> String {
    self.end.format(DATE_FORMAT).to_string()
  }
}

impl fmt::Display for ReportPeriod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} → {}", self.start_str(), self.end_str())
  }
}

fn parse_date(value: &str) -> Result<NaiveDate, PeriodError> {
  NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
    .map_err(|source| PeriodError::InvalidDate { value: value.to_string(), source })
}
