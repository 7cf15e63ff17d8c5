//! Thresholds that decide when the insight rules recommend an action

use serde::{Deserialize, Serialize};

/// Upper bound on recommendations in a report
pub const MAX_ACTIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightThresholds {
  /// Share of queries losing clicks at which a broad decline is flagged
  #[serde(default = "default_broad_decline_share")]
  pub broad_decline_share: f64,
  /// Average position increase (in rank units) treated as a regression
  #[serde(default = "default_position_regression")]
  pub position_regression: f64,
  /// CTR drop, in percentage points, treated as a regression
  #[serde(default = "default_ctr_drop_points")]
  pub ctr_drop_points: f64,
  /// Relative organic-session change that triggers a channel action
  #[serde(default = "default_organic_swing")]
  pub organic_swing: f64,
  /// Channel key that denotes organic search traffic
  #[serde(default = "default_organic_channel")]
  pub organic_channel: String,
  /// Cap on rule-produced actions; the generic fallback is never cut
  #[serde(default = "default_max_actions")]
  pub max_actions: usize,
}

fn default_broad_decline_share() -> f64 {
  0.6
}
fn default_position_regression() -> f64 {
  0.30
}
fn default_ctr_drop_points() -> f64 {
  0.5
}
fn default_organic_swing() -> f64 {
  0.10
}
fn default_organic_channel() -> String {
  "Organic Search".to_string()
}
fn default_max_actions() -> usize {
  MAX_ACTIONS
}

impl Default for InsightThresholds {
  fn default() -> Self {
    Self {
      broad_decline_share: default_broad_decline_share(),
      position_regression: default_position_regression(),
      ctr_drop_points: default_ctr_drop_points(),
      organic_swing: default_organic_swing(),
      organic_channel: default_organic_channel(),
      max_actions: default_max_actions(),
    }
  }
}

impl InsightThresholds {
  /// Configured action limit, never above [`MAX_ACTIONS`]
  pub fn action_limit(&self) -> usize {
    self.max_actions.min(MAX_ACTIONS)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_json_uses_defaults() {
    let thresholds: InsightThresholds =
      serde_json::from_str(r#"{ "organic_channel": "Organic Social" }"#).unwrap();
    assert_eq!(thresholds.organic_channel, "Organic Social");
    assert_eq!(thresholds.broad_decline_share, 0.6);
    assert_eq!(thresholds.position_regression, 0.30);
    assert_eq!(thresholds.max_actions, 5);
  }

  #[test]
  fn test_action_limit_is_capped() {
    let thresholds = InsightThresholds { max_actions: 12, ..Default::default() };
    assert_eq!(thresholds.action_limit(), MAX_ACTIONS);

    let thresholds = InsightThresholds { max_actions: 2, ..Default::default() };
    assert_eq!(thresholds.action_limit(), 2);
  }
}
