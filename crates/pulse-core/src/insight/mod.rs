//! Rule-based insight synthesis
//!
//! Turns the current, previous and compared datasets of both metric
//! families into an ordered executive summary and a short, prioritized
//! list of actions. The rules live in [`rules`] and run in a fixed order;
//! the engine only collects their output, deduplicates actions, applies
//! the generic fallback and truncates.

pub mod rules;

use serde::{Deserialize, Serialize};

use crate::aggregate::PeriodTotals;
use crate::dataset::{ComparedDataset, Dataset};
use crate::thresholds::InsightThresholds;

pub use rules::{InsightContext, Rule, RuleOutcome, RULES};

/// Recommendations used when no rule produced an action
pub const FALLBACK_ACTIONS: [&str; 3] = [
  "Refresh and expand content on pages ranking just outside the top results for high-impression queries.",
  "Rewrite titles and meta descriptions for high-impression, low-CTR queries to lift click-through rate.",
  "Add internal links from high-traffic pages to pages that are close to ranking gains.",
];

/// Summary sentences and prioritized actions for one report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
  pub summary: Vec<String>,
  pub actions: Vec<String>,
}

pub struct InsightEngine {
  thresholds: InsightThresholds,
}

impl InsightEngine {
  pub fn new(thresholds: InsightThresholds) -> Self {
    Self { thresholds }
  }

  pub fn thresholds(&self) -> &InsightThresholds {
    &self.thresholds
  }

  /// Run the rule cascade over both metric families
  pub fn synthesize(
    &self,
    current_queries: &Dataset,
    previous_queries: &Dataset,
    compared_queries: &ComparedDataset,
    current_channels: &Dataset,
    previous_channels: &Dataset,
    compared_channels: &ComparedDataset,
  ) -> Insights {
    let context = InsightContext {
      current_queries,
      previous_queries,
      compared_queries,
      current_channels,
      previous_channels,
      compared_channels,
      current: PeriodTotals::from_datasets(current_queries, current_channels),
      previous: PeriodTotals::from_datasets(previous_queries, previous_channels),
      thresholds: &self.thresholds,
    };

    self.run(&context, RULES)
  }

  /// Apply `rules` in order to an already assembled context
  pub fn run(&self, context: &InsightContext<'_>, rules: &[Rule]) -> Insights {
    let mut insights = Insights::default();

    for rule in rules {
      let outcome = rule(context);
      if let Some(sentence) = outcome.summary {
        insights.summary.push(sentence);
      }
      if let Some(action) = outcome.action {
        if !insights.actions.contains(&action) {
          insights.actions.push(action);
        }
      }
    }

    // The limit caps rule output only; the fallback set is always complete
    if insights.actions.is_empty() {
      tracing::debug!("no insight rule fired, using generic recommendations");
      insights.actions = FALLBACK_ACTIONS.iter().map(|action| action.to_string()).collect();
    } else {
      insights.actions.truncate(self.thresholds.action_limit());
    }
    tracing::debug!(
      summary = insights.summary.len(),
      actions = insights.actions.len(),
      "synthesized insights"
    );

    insights
  }
}

impl Default for InsightEngine {
  fn default() -> Self {
    Self::new(InsightThresholds::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::compare::compare;
  use crate::dataset::fields::{CHANNEL_METRICS, QUERY_METRICS};
  use crate::dataset::MetricRecord;

  fn run_engine(
    engine: &InsightEngine,
    current_queries: &Dataset,
    previous_queries: &Dataset,
    current_channels: &Dataset,
    previous_channels: &Dataset,
  ) -> Insights {
    let compared_queries = compare(current_queries, Some(previous_queries), &QUERY_METRICS);
    let compared_channels = compare(current_channels, Some(previous_channels), &CHANNEL_METRICS);
    engine.synthesize(
      current_queries,
      previous_queries,
      &compared_queries,
      current_channels,
      previous_channels,
      &compared_channels,
    )
  }

  fn always_acts(_: &InsightContext<'_>) -> RuleOutcome {
    RuleOutcome::action("Same action.")
  }

  fn numbered_action(context: &InsightContext<'_>) -> RuleOutcome {
    RuleOutcome::action(format!("Action for {} queries.", context.current_queries.len()))
  }

  #[test]
  fn test_all_empty_inputs_degrade_to_fallback() {
    let engine = InsightEngine::default();
    let empty_queries = Dataset::queries();
    let empty_channels = Dataset::channels();

    let insights = run_engine(&engine, &empty_queries, &empty_queries, &empty_channels, &empty_channels);

    assert_eq!(insights.summary.len(), 1);
    assert!(insights.summary[0].contains("baseline"));
    assert_eq!(insights.actions, FALLBACK_ACTIONS.to_vec());
  }

  #[test]
  fn test_duplicate_actions_are_kept_once() {
    let engine = InsightEngine::default();
    let queries = Dataset::queries();
    let channels = Dataset::channels();
    let compared_queries = compare(&queries, None, &QUERY_METRICS);
    let compared_channels = compare(&channels, None, &CHANNEL_METRICS);
    let context = InsightContext {
      current_queries: &queries,
      previous_queries: &queries,
      compared_queries: &compared_queries,
      current_channels: &channels,
      previous_channels: &channels,
      compared_channels: &compared_channels,
      current: PeriodTotals::default(),
      previous: PeriodTotals::default(),
      thresholds: engine.thresholds(),
    };

    let rules: [Rule; 3] = [always_acts, always_acts, numbered_action];
    let insights = engine.run(&context, &rules);
    assert_eq!(insights.actions, vec!["Same action.".to_string(), "Action for 0 queries.".to_string()]);
  }

  #[test]
  fn test_fallback_ignores_configured_limit() {
    let empty_queries = Dataset::queries();
    let channels = Dataset::channels().with_records(vec![MetricRecord::channel("Direct", 5.0, 5.0)]);

    for max_actions in [0, 1, 2, 5] {
      let engine = InsightEngine::new(InsightThresholds { max_actions, ..Default::default() });
      let insights = run_engine(&engine, &empty_queries, &empty_queries, &channels, &channels);
      assert_eq!(insights.actions, FALLBACK_ACTIONS.to_vec(), "max_actions = {max_actions}");
    }
  }

  #[test]
  fn test_rule_actions_truncated_to_configured_limit() {
    let engine = InsightEngine::new(InsightThresholds { max_actions: 1, ..Default::default() });
    let queries = Dataset::queries();
    let channels = Dataset::channels();
    let compared_queries = compare(&queries, None, &QUERY_METRICS);
    let compared_channels = compare(&channels, None, &CHANNEL_METRICS);
    let context = InsightContext {
      current_queries: &queries,
      previous_queries: &queries,
      compared_queries: &compared_queries,
      current_channels: &channels,
      previous_channels: &channels,
      compared_channels: &compared_channels,
      current: PeriodTotals::default(),
      previous: PeriodTotals::default(),
      thresholds: engine.thresholds(),
    };

    let rules: [Rule; 2] = [always_acts, numbered_action];
    let insights = engine.run(&context, &rules);
    assert_eq!(insights.actions, vec!["Same action.".to_string()]);
  }
}
