//! One report run: fetch, compare, synthesize, write
//!
//! The current period is required; a failure there aborts the run. A
//! failure fetching the previous period only costs the baseline, so it is
//! logged and replaced with an empty dataset.

use anyhow::{Context, Result};
use pulse_core::dataset::fields::{CHANNEL_METRICS, QUERY_METRICS};
use pulse_core::{compare, Dataset, InsightEngine};
use std::path::{Path, PathBuf};

use crate::config::ReportSettings;
use crate::period::ReportPeriod;
use crate::report::{chart, export, markdown, ReportBundle};
use crate::sources::{ChannelSource, CsvArchive, QuerySource, SourceError};

/// Fetch both periods' datasets and produce the compared data and insights
pub async fn run(
  settings: &ReportSettings,
  queries: &dyn QuerySource,
  channels: &dyn ChannelSource,
) -> Result<ReportBundle> {
  let period = settings.period;
  let previous_period = settings.previous_period;

  let current_queries = queries
    .fetch_queries(&period)
    .await
    .with_context(|| format!("Failed to fetch query data for {}", period))?;
  let previous_queries =
    baseline(queries.fetch_queries(&previous_period).await, Dataset::queries(), &previous_period);

  let current_pages = queries
    .fetch_pages(&period)
    .await
    .with_context(|| format!("Failed to fetch page data for {}", period))?;
  let previous_pages =
    baseline(queries.fetch_pages(&previous_period).await, Dataset::pages(), &previous_period);

  let current_channels = channels
    .fetch_channels(&period)
    .await
    .with_context(|| format!("Failed to fetch channel data for {}", period))?;
  let previous_channels =
    baseline(channels.fetch_channels(&previous_period).await, Dataset::channels(), &previous_period);

  tracing::info!(
    queries = current_queries.len(),
    previous_queries = previous_queries.len(),
    pages = current_pages.len(),
    previous_pages = previous_pages.len(),
    channels = current_channels.len(),
    previous_channels = previous_channels.len(),
    "datasets ready"
  );

  let compared_queries = compare(&current_queries, Some(&previous_queries), &QUERY_METRICS);
  let compared_pages = compare(&current_pages, Some(&previous_pages), &QUERY_METRICS);
  let compared_channels = compare(&current_channels, Some(&previous_channels), &CHANNEL_METRICS);

  let insights = InsightEngine::new(settings.thresholds.clone()).synthesize(
    &current_queries,
    &previous_queries,
    &compared_queries,
    &current_channels,
    &previous_channels,
    &compared_channels,
  );

  Ok(ReportBundle {
    period,
    previous_period,
    current_queries,
    previous_queries,
    compared_queries,
    current_pages,
    previous_pages,
    compared_pages,
    current_channels,
    previous_channels,
    compared_channels,
    insights,
    generated_at: chrono::Utc::now(),
  })
}

fn baseline(fetched: Result<Dataset, SourceError>, empty: Dataset, period: &ReportPeriod) -> Dataset {
  match fetched {
    Ok(dataset) => dataset,
    Err(e) => {
      tracing::warn!(%period, error = %e, "previous-period data unavailable, reporting without a baseline");
      empty
    }
  }
}

/// Files written for one report
#[derive(Debug, Clone)]
pub struct Artifacts {
  pub report: PathBuf,
  /// Absent when there were no queries to plot
  pub chart: Option<PathBuf>,
  pub compared_queries: PathBuf,
  pub compared_pages: PathBuf,
  pub compared_channels: PathBuf,
  pub raw_queries: PathBuf,
  pub raw_pages: PathBuf,
  pub raw_channels: PathBuf,
}

impl Artifacts {
  pub fn paths(&self) -> Vec<&PathBuf> {
    let mut paths = vec![&self.report];
    paths.extend(self.chart.as_ref());
    paths.extend([
      &self.compared_queries,
      &self.compared_pages,
      &self.compared_channels,
      &self.raw_queries,
      &self.raw_pages,
      &self.raw_channels,
    ]);
    paths
  }
}

/// Write the markdown report, the chart, compared CSVs and the raw-data archive
pub fn write_artifacts(bundle: &ReportBundle, settings: &ReportSettings) -> Result<Artifacts> {
  let dir = &settings.output_dir;
  std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
  let label = bundle.period.label();

  let chart_name = format!("{label}_top_queries.svg");
  let chart = match chart::top_queries_svg(&bundle.current_queries)? {
    Some(svg) => {
      let path = dir.join(&chart_name);
      write_file(&path, &svg)?;
      Some(path)
    }
    None => None,
  };

  let options = markdown::MarkdownOptions {
    top_rows: settings.top_rows,
    chart: chart.as_ref().map(|_| chart_name.as_str()),
  };
  let report = dir.join(format!("{label}.md"));
  write_file(&report, &markdown::render(bundle, &options))?;

  let compared_queries = dir.join(format!("{label}_queries_compared.csv"));
  write_file(&compared_queries, &export::compared_csv(&bundle.compared_queries)?)?;

  let compared_pages = dir.join(format!("{label}_pages_compared.csv"));
  write_file(&compared_pages, &export::compared_csv(&bundle.compared_pages)?)?;

  let compared_channels = dir.join(format!("{label}_channels_compared.csv"));
  write_file(&compared_channels, &export::compared_csv(&bundle.compared_channels)?)?;

  let archive = CsvArchive::new(dir.join("data"));
  let raw_queries = archive.write_queries(&bundle.period, &bundle.current_queries)?;
  let raw_pages = archive.write_pages(&bundle.period, &bundle.current_pages)?;
  let raw_channels = archive.write_channels(&bundle.period, &bundle.current_channels)?;

  Ok(Artifacts {
    report,
    chart,
    compared_queries,
    compared_pages,
    compared_channels,
    raw_queries,
    raw_pages,
    raw_channels,
  })
}

fn write_file(path: &Path, content: &str) -> Result<()> {
  std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{Overrides, PulseConfig};
  use async_trait::async_trait;
  use pulse_core::MetricRecord;
  use tempfile::TempDir;

  /// Serves fixed data for the current period and fails for any other
  struct OneWeek {
    period: ReportPeriod,
  }

  #[async_trait]
  impl QuerySource for OneWeek {
    async fn fetch_queries(&self, period: &ReportPeriod) -> Result<Dataset, SourceError> {
      if *period != self.period {
        return Err(SourceError::Decode { endpoint: "test".to_string(), message: "no data".to_string() });
      }
      Ok(Dataset::queries().with_records(vec![MetricRecord::query("shoes", 100.0, 1000.0, 0.1, 5.0)]))
    }

    async fn fetch_pages(&self, period: &ReportPeriod) -> Result<Dataset, SourceError> {
      if *period != self.period {
        return Err(SourceError::Decode { endpoint: "test".to_string(), message: "no data".to_string() });
      }
      Ok(Dataset::pages().with_records(vec![MetricRecord::query("https://example.com/shoes", 80.0, 700.0, 0.11, 4.0)]))
    }
  }

  #[async_trait]
  impl ChannelSource for OneWeek {
    async fn fetch_channels(&self, period: &ReportPeriod) -> Result<Dataset, SourceError> {
      if *period != self.period {
        return Err(SourceError::Decode { endpoint: "test".to_string(), message: "no data".to_string() });
      }
      Ok(Dataset::channels().with_records(vec![MetricRecord::channel("Organic Search", 80.0, 60.0)]))
    }
  }

  fn settings(output_dir: &Path) -> ReportSettings {
    let period = ReportPeriod::parse("2024-06-03", "2024-06-09").unwrap();
    let overrides = Overrides { output_dir: Some(output_dir.to_path_buf()), ..Default::default() };
    ReportSettings::resolve(PulseConfig::default(), overrides, period)
  }

  #[tokio::test]
  async fn test_previous_period_failure_degrades_to_empty_baseline() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings(temp_dir.path());
    let source = OneWeek { period: settings.period };

    let bundle = run(&settings, &source, &source).await.unwrap();

    assert!(bundle.previous_queries.is_empty());
    assert!(bundle.previous_channels.is_empty());
    let shoes = bundle.compared_queries.get("shoes").unwrap();
    assert_eq!(shoes.change("clicks").unwrap().previous, None);
    assert!(bundle.insights.summary[0].contains("no previous-period baseline"));
  }

  #[tokio::test]
  async fn test_current_period_failure_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings(temp_dir.path());
    let source = OneWeek { period: settings.previous_period };

    let err = run(&settings, &source, &source).await.unwrap_err();
    assert!(err.to_string().contains("Failed to fetch query data"));
  }

  #[tokio::test]
  async fn test_write_artifacts_creates_every_file() {
    let temp_dir = TempDir::new().unwrap();
    let output_dir = temp_dir.path().join("reports");
    let settings = settings(&output_dir);
    let source = OneWeek { period: settings.period };

    let bundle = run(&settings, &source, &source).await.unwrap();
    let artifacts = write_artifacts(&bundle, &settings).unwrap();

    assert_eq!(artifacts.report, output_dir.join("2024-06-03_to_2024-06-09.md"));
    assert_eq!(artifacts.raw_queries, output_dir.join("data").join("queries_2024-06-03_to_2024-06-09.csv"));
    for path in artifacts.paths() {
      assert!(path.exists(), "{} was not written", path.display());
    }

    assert_eq!(artifacts.chart, Some(output_dir.join("2024-06-03_to_2024-06-09_top_queries.svg")));
    assert_eq!(artifacts.paths().len(), 8);

    let report = std::fs::read_to_string(&artifacts.report).unwrap();
    assert!(report.contains("| shoes |"));
    assert!(report.contains("| https://example.com/shoes |"));
    assert!(report.contains("![Top queries by clicks](2024-06-03_to_2024-06-09_top_queries.svg)"));
  }

  #[tokio::test]
  async fn test_empty_archive_renders_no_data_report() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings(&temp_dir.path().join("reports"));
    let archive = CsvArchive::new(temp_dir.path().join("missing"));

    let bundle = run(&settings, &archive, &archive).await.unwrap();
    let artifacts = write_artifacts(&bundle, &settings).unwrap();
    let report = std::fs::read_to_string(&artifacts.report).unwrap();

    assert!(report.contains("_No data_"));
    assert!(report.contains("Clicks totaled 0 this period; no previous-period baseline"));
    assert!(artifacts.chart.is_none());
    assert_eq!(artifacts.paths().len(), 7);
    assert_eq!(bundle.insights.actions.len(), 3);
  }
}
