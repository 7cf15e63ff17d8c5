//! Configuration management for Pulse
//!
//! A JSON file supplies site identifiers, table sizes and insight
//! thresholds; command-line flags and environment variables override it.
//! The resolved [`ReportSettings`] is what the pipeline receives.

use pulse_core::InsightThresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::period::ReportPeriod;

/// Files checked, in order, when no explicit config path is given
pub const CONFIG_PATHS: [&str; 2] = [".pulse.json", "pulse.json"];

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to read config file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse config file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("Failed to serialize config for {path}: {source}")]
  Serialize {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("Failed to write config file {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{0} is not configured (set it in pulse.json, with a flag, or via the environment)")]
  Missing(&'static str),
}

/// On-disk configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
  /// Search Console property, e.g. `https://example.com/` or `sc-domain:example.com`
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub site_url: Option<String>,
  /// GA4 property id
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub property_id: Option<String>,
  /// Rows requested from Search Console per period
  #[serde(default = "default_row_limit")]
  pub row_limit: u32,
  /// Rows shown in the report's query table
  #[serde(default = "default_top_rows")]
  pub top_rows: usize,
  #[serde(default = "default_output_dir")]
  pub output_dir: PathBuf,
  #[serde(default)]
  pub thresholds: InsightThresholds,
}

fn default_row_limit() -> u32 {
  50
}
fn default_top_rows() -> usize {
  20
}
fn default_output_dir() -> PathBuf {
  PathBuf::from("reports/weekly")
}

impl Default for PulseConfig {
  fn default() -> Self {
    Self {
      site_url: None,
      property_id: None,
      row_limit: default_row_limit(),
      top_rows: default_top_rows(),
      output_dir: default_output_dir(),
      thresholds: InsightThresholds::default(),
    }
  }
}

impl PulseConfig {
  /// Load configuration from a file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
  }

  /// Load from `explicit`, else the first config file found, else defaults
  pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    if let Some(path) = explicit {
      return Self::load_from_file(path);
    }

    for path in Self::search_paths() {
      if path.exists() {
        tracing::debug!(path = %path.display(), "loading config");
        return Self::load_from_file(&path);
      }
    }

    Ok(Self::default())
  }

  /// Candidate config locations: the working directory, then the user config dir
  pub fn search_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = CONFIG_PATHS.iter().map(PathBuf::from).collect();
    if let Some(dir) = dirs::config_dir() {
      paths.push(dir.join("pulse").join("config.json"));
    }
    paths
  }

  /// Save configuration to a file
  pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let write_error = |source| ConfigError::Write { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    let content = serde_json::to_string_pretty(self)
      .map_err(|source| ConfigError::Serialize { path: path.to_path_buf(), source })?;
    std::fs::write(path, content).map_err(write_error)
  }
}

/// Command-line and environment values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub site_url: Option<String>,
  pub property_id: Option<String>,
  pub output_dir: Option<PathBuf>,
}

/// Fully resolved settings for one report run
#[derive(Debug, Clone)]
pub struct ReportSettings {
  pub period: ReportPeriod,
  pub previous_period: ReportPeriod,
  pub site_url: Option<String>,
  pub property_id: Option<String>,
  pub row_limit: u32,
  pub top_rows: usize,
  pub output_dir: PathBuf,
  pub thresholds: InsightThresholds,
}

impl ReportSettings {
  pub fn resolve(config: PulseConfig, overrides: Overrides, period: ReportPeriod) -> Self {
    Self {
      period,
      previous_period: period.previous(),
      site_url: overrides.site_url.or(config.site_url),
      property_id: overrides.property_id.or(config.property_id),
      row_limit: config.row_limit,
      top_rows: config.top_rows,
      output_dir: overrides.output_dir.unwrap_or(config.output_dir),
      thresholds: config.thresholds,
    }
  }

  pub fn require_site_url(&self) -> Result<&str, ConfigError> {
    self.site_url.as_deref().ok_or(ConfigError::Missing("Search Console site URL (GSC_SITE_URL)"))
  }

  pub fn require_property_id(&self) -> Result<&str, ConfigError> {
    self.property_id.as_deref().ok_or(ConfigError::Missing("GA4 property id (GA4_PROPERTY_ID)"))
  }
}
