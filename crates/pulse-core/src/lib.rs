//! Period-over-period comparison and insight synthesis
//!
//! The pure core of the weekly report: a keyed metric [`Dataset`] model,
//! a left-join [`compare`] that derives deltas and percentage changes,
//! reducers in [`aggregate`], and the rule cascade in [`insight`] that turns
//! the numbers into summary sentences and prioritized actions.

pub mod aggregate;
pub mod compare;
pub mod dataset;
pub mod insight;
pub mod thresholds;

pub use aggregate::{percent_change, safe_ratio, sum, weighted_average, PeriodTotals};
pub use compare::compare;
pub use dataset::{fields, ComparedDataset, ComparedRecord, Dataset, MetricChange, MetricRecord};
pub use insight::{InsightEngine, Insights};
pub use thresholds::InsightThresholds;
