use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};

use crate::config::{ConfigError, Overrides, PulseConfig, ReportSettings};
use crate::output;
use crate::period::ReportPeriod;
use crate::pipeline;
use crate::sources::{AnalyticsClient, CsvArchive, SearchConsoleClient};

/// Inputs of `pulse run` after clap and the environment have had their say
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  pub start: Option<String>,
  pub end: Option<String>,
  pub config: Option<PathBuf>,
  pub site_url: Option<String>,
  pub property_id: Option<String>,
  pub access_token: Option<String>,
  pub output_dir: Option<PathBuf>,
  pub offline: Option<PathBuf>,
}

fn today() -> NaiveDate {
  Local::now().date_naive()
}

pub async fn run_report(options: RunOptions) -> Result<()> {
  let period = ReportPeriod::resolve(options.start.as_deref(), options.end.as_deref(), today())?;
  let config = PulseConfig::load(options.config.as_deref())?;
  let overrides =
    Overrides { site_url: options.site_url, property_id: options.property_id, output_dir: options.output_dir };
  let settings = ReportSettings::resolve(config, overrides, period);

  output::banner(&format!("Weekly Search Report\n{} (previous: {})", settings.period, settings.previous_period));

  let bundle = match &options.offline {
    Some(dir) => {
      output::info(&format!("Reading archived data from {}", dir.display()));
      let archive = CsvArchive::new(dir);
      pipeline::run(&settings, &archive, &archive).await?
    }
    None => {
      let site_url = settings.require_site_url()?;
      let property_id = settings.require_property_id()?;
      let token = options.access_token.as_deref().ok_or(ConfigError::Missing("Google access token (GOOGLE_ACCESS_TOKEN)"))?;

      let queries = SearchConsoleClient::new(site_url, token, settings.row_limit);
      let channels = AnalyticsClient::new(property_id, token);
      pipeline::run(&settings, &queries, &channels).await?
    }
  };

  if bundle.current_queries.is_empty() && bundle.current_channels.is_empty() {
    output::warn("No data was returned for the reporting period");
  }

  for sentence in &bundle.insights.summary {
    output::info(sentence);
  }

  let artifacts = pipeline::write_artifacts(&bundle, &settings)?;
  for path in artifacts.paths() {
    output::success(&format!("Wrote {}", path.display()));
  }
  println!("{}", artifacts.report.display());

  Ok(())
}

/// Write a default config file to `path`
pub fn init_config(path: &Path, force: bool) -> Result<()> {
  if path.exists() && !force {
    bail!("{} already exists (use --force to overwrite)", path.display());
  }

  PulseConfig::default().save_to_file(path)?;
  output::success(&format!("Created {}", path.display()));
  Ok(())
}

/// Print the reporting period and its baseline
pub fn show_period(start: Option<&str>, end: Option<&str>) -> Result<()> {
  let period = ReportPeriod::resolve(start, end, today())?;
  println!("current:  {}", period);
  println!("previous: {}", period.previous());
  println!("label:    {}", period.label());
  Ok(())
}
