//! The insight rule cascade
//!
//! Each rule is an independent function over the full [`InsightContext`]
//! and returns at most one summary sentence and at most one action.
//! [`RULES`] fixes the order in which they run; summary sentences and
//! actions keep that order in the final report.

use crate::aggregate::{percent_change, safe_ratio, PeriodTotals};
use crate::dataset::{fields, ComparedDataset, ComparedRecord, Dataset};
use crate::thresholds::InsightThresholds;

/// Everything a rule may look at
pub struct InsightContext<'a> {
  pub current_queries: &'a Dataset,
  pub previous_queries: &'a Dataset,
  pub compared_queries: &'a ComparedDataset,
  pub current_channels: &'a Dataset,
  pub previous_channels: &'a Dataset,
  pub compared_channels: &'a ComparedDataset,
  pub current: PeriodTotals,
  pub previous: PeriodTotals,
  pub thresholds: &'a InsightThresholds,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
  pub summary: Option<String>,
  pub action: Option<String>,
}

impl RuleOutcome {
  pub fn none() -> Self {
    Self::default()
  }

  pub fn summary(sentence: impl Into<String>) -> Self {
    Self { summary: Some(sentence.into()), action: None }
  }

  pub fn action(action: impl Into<String>) -> Self {
    Self { summary: None, action: Some(action.into()) }
  }
}

pub type Rule = fn(&InsightContext<'_>) -> RuleOutcome;

pub const RULES: &[Rule] = &[
  clicks_volume,
  impressions_volume,
  click_through_rate,
  average_position,
  top_gaining_query,
  top_losing_query,
  broad_decline,
  ranking_regression,
  ctr_regression,
  top_channel,
  organic_swing,
];

pub const ACTION_BROAD_DECLINE: &str =
  "Investigate the largest click drops: most tracked queries lost clicks this week.";
pub const ACTION_RANKING_REGRESSION: &str =
  "Average position slipped: review ranking losses on top queries for content or technical changes.";
pub const ACTION_CTR_REGRESSION: &str =
  "Click-through rate dropped: revisit titles and meta descriptions of high-impression queries.";
pub const ACTION_ORGANIC_DECLINE: &str =
  "Organic sessions declined: investigate indexing, ranking and tracking changes for organic landing pages.";
pub const ACTION_ORGANIC_GROWTH: &str =
  "Organic sessions grew: reinforce the pages driving the gain with fresh content and internal links.";

/// Rule 1: total clicks against the previous period
pub fn clicks_volume(context: &InsightContext<'_>) -> RuleOutcome {
  let current = context.current.clicks;
  let previous = context.previous.clicks;

  if previous > 0.0 {
    RuleOutcome::summary(volume_sentence("Clicks", current, previous))
  } else {
    RuleOutcome::summary(format!(
      "Clicks totaled {} this period; no previous-period baseline is available for comparison.",
      count(current)
    ))
  }
}

/// Rule 2: total impressions, only when a baseline exists
pub fn impressions_volume(context: &InsightContext<'_>) -> RuleOutcome {
  let previous = context.previous.impressions;
  if previous > 0.0 {
    RuleOutcome::summary(volume_sentence("Impressions", context.current.impressions, previous))
  } else {
    RuleOutcome::none()
  }
}

/// Rule 3: CTR, with the change in percentage points of the ratio
pub fn click_through_rate(context: &InsightContext<'_>) -> RuleOutcome {
  let Some(current) = context.current.click_through_rate else {
    return RuleOutcome::none();
  };

  let sentence = match context.previous.click_through_rate {
    Some(previous) => format!(
      "Click-through rate was {:.2}% ({:+.2} pp versus the previous period).",
      current * 100.0,
      (current - previous) * 100.0
    ),
    None => format!("Click-through rate was {:.2}%.", current * 100.0),
  };
  RuleOutcome::summary(sentence)
}

/// Rule 4: impression-weighted average position; a negative delta is an improvement
pub fn average_position(context: &InsightContext<'_>) -> RuleOutcome {
  let Some(current) = context.current.average_position else {
    return RuleOutcome::none();
  };

  let sentence = match context.previous.average_position {
    Some(previous) => {
      let delta = current - previous;
      let direction = if delta < 0.0 {
        ", improved"
      } else if delta > 0.0 {
        ", worsened"
      } else {
        ""
      };
      format!(
        "Average position was {:.2} ({:+.2} versus the previous period{}).",
        current, delta, direction
      )
    }
    None => format!("Average position was {:.2}.", current),
  };
  RuleOutcome::summary(sentence)
}

/// Rule 5a: query with the largest positive click delta
pub fn top_gaining_query(context: &InsightContext<'_>) -> RuleOutcome {
  match extremum(context.compared_queries, |delta| delta > 0.0, |delta, best| delta > best) {
    Some((record, delta)) => RuleOutcome::summary(format!(
      "Top gaining query: \"{}\" ({} clicks).",
      record.key,
      signed_count(delta)
    )),
    None => RuleOutcome::none(),
  }
}

/// Rule 5b: query with the largest click loss
pub fn top_losing_query(context: &InsightContext<'_>) -> RuleOutcome {
  match extremum(context.compared_queries, |delta| delta < 0.0, |delta, best| delta < best) {
    Some((record, delta)) => RuleOutcome::summary(format!(
      "Top losing query: \"{}\" ({} clicks).",
      record.key,
      signed_count(delta)
    )),
    None => RuleOutcome::none(),
  }
}

/// Rule 6: most queries lost clicks
pub fn broad_decline(context: &InsightContext<'_>) -> RuleOutcome {
  let deltas: Vec<f64> =
    context.compared_queries.iter().filter_map(|record| record.delta(fields::CLICKS)).collect();
  let declining = deltas.iter().filter(|delta| **delta < 0.0).count();

  match safe_ratio(declining as f64, deltas.len() as f64) {
    Some(share) if share >= context.thresholds.broad_decline_share => {
      RuleOutcome::action(ACTION_BROAD_DECLINE)
    }
    _ => RuleOutcome::none(),
  }
}

/// Rule 7: average position worsened beyond the threshold
pub fn ranking_regression(context: &InsightContext<'_>) -> RuleOutcome {
  match (context.current.average_position, context.previous.average_position) {
    (Some(current), Some(previous)) if current - previous > context.thresholds.position_regression => {
      RuleOutcome::action(ACTION_RANKING_REGRESSION)
    }
    _ => RuleOutcome::none(),
  }
}

/// Rule 8: CTR fell by more than the threshold in percentage points
pub fn ctr_regression(context: &InsightContext<'_>) -> RuleOutcome {
  match (context.current.click_through_rate, context.previous.click_through_rate) {
    (Some(current), Some(previous))
      if (previous - current) * 100.0 > context.thresholds.ctr_drop_points =>
    {
      RuleOutcome::action(ACTION_CTR_REGRESSION)
    }
    _ => RuleOutcome::none(),
  }
}

/// Rule 9: channel with the most sessions this period
pub fn top_channel(context: &InsightContext<'_>) -> RuleOutcome {
  let mut top = None;
  for record in context.current_channels {
    let sessions = record.value(fields::SESSIONS);
    match top {
      Some((_, best)) if sessions <= best => {}
      _ => top = Some((record, sessions)),
    }
  }

  match top {
    Some((record, sessions)) => RuleOutcome::summary(format!(
      "Top traffic channel: {} with {} sessions.",
      record.key,
      count(sessions)
    )),
    None => RuleOutcome::none(),
  }
}

/// Rule 10: large swing in organic search sessions
pub fn organic_swing(context: &InsightContext<'_>) -> RuleOutcome {
  let Some(change) = context
    .compared_channels
    .get(&context.thresholds.organic_channel)
    .and_then(|record| record.change(fields::SESSIONS))
  else {
    return RuleOutcome::none();
  };

  let relative = match change.previous {
    Some(previous) if previous > 0.0 => percent_change(change.current, previous),
    _ => None,
  };

  let swing = context.thresholds.organic_swing;
  match relative {
    Some(relative) if relative <= -swing => RuleOutcome::action(ACTION_ORGANIC_DECLINE),
    Some(relative) if relative >= swing => RuleOutcome::action(ACTION_ORGANIC_GROWTH),
    _ => RuleOutcome::none(),
  }
}

/// First record, in input order, whose click delta passes `eligible` and
/// beats every earlier candidate under `better`
fn extremum<'a>(
  compared: &'a ComparedDataset,
  eligible: impl Fn(f64) -> bool,
  better: impl Fn(f64, f64) -> bool,
) -> Option<(&'a ComparedRecord, f64)> {
  let mut best: Option<(&ComparedRecord, f64)> = None;
  for record in compared.iter() {
    let Some(delta) = record.delta(fields::CLICKS) else {
      continue;
    };
    if !eligible(delta) {
      continue;
    }
    match best {
      Some((_, best_delta)) if !better(delta, best_delta) => {}
      _ => best = Some((record, delta)),
    }
  }
  best
}

fn volume_sentence(label: &str, current: f64, previous: f64) -> String {
  match percent_change(current, previous) {
    Some(change) if change > 0.0 => format!(
      "{} increased by {:.1}% versus the previous period ({} → {}).",
      label,
      change * 100.0,
      count(previous),
      count(current)
    ),
    Some(change) if change < 0.0 => format!(
      "{} decreased by {:.1}% versus the previous period ({} → {}).",
      label,
      change.abs() * 100.0,
      count(previous),
      count(current)
    ),
    _ => format!(
      "{} were unchanged versus the previous period ({} → {}).",
      label,
      count(previous),
      count(current)
    ),
  }
}

fn count(value: f64) -> String {
  if value.fract() == 0.0 {
    format!("{:.0}", value)
  } else {
    format!("{:.1}", value)
  }
}

fn signed_count(value: f64) -> String {
  if value.fract() == 0.0 {
    format!("{:+.0}", value)
  } else {
    format!("{:+.1}", value)
  }
}
