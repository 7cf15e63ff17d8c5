use pulse_core::{fields, percent_change, ComparedDataset, ComparedRecord, Dataset, MetricChange};

use super::{format_number, format_percent, format_rate, format_signed, ReportBundle, NO_DATA};

/// Channel groups whose name contains this count as organic traffic
pub const ORGANIC_MARKER: &str = "Organic";

/// Rendering knobs that come from configuration
#[derive(Debug, Clone)]
pub struct MarkdownOptions<'a> {
  /// Rows shown in the query and page tables
  pub top_rows: usize,
  /// Chart image, relative to the report file
  pub chart: Option<&'a str>,
}

/// Render the full weekly report
pub fn render(bundle: &ReportBundle, options: &MarkdownOptions<'_>) -> String {
  let mut md = Vec::new();

  md.push("# Weekly Search Report\n".to_string());
  md.push(format!("- Range: **{}** (previous: {})", bundle.period, bundle.previous_period));
  md.push(format!("- Generated: {}\n", bundle.generated_at.format("%Y-%m-%d %H:%M UTC")));

  md.push("## Summary\n".to_string());
  if bundle.insights.summary.is_empty() {
    md.push(NO_DATA.to_string());
  } else {
    md.extend(bundle.insights.summary.iter().map(|sentence| format!("- {}", sentence)));
  }

  md.push("\n## Action items\n".to_string());
  if bundle.insights.actions.is_empty() {
    md.push(NO_DATA.to_string());
  } else {
    md.extend(bundle.insights.actions.iter().enumerate().map(|(i, action)| format!("{}. {}", i + 1, action)));
  }

  md.push("\n## Key metrics\n".to_string());
  md.push(key_metrics(bundle));

  md.push("\n## Top queries (by clicks)\n".to_string());
  if let Some(chart) = options.chart {
    md.push(format!("![Top queries by clicks]({})\n", chart));
  }
  md.push(search_table("Query", &bundle.compared_queries, options.top_rows));

  md.push("\n## Top pages (by clicks)\n".to_string());
  md.push(search_table("Page", &bundle.compared_pages, options.top_rows));

  md.push("\n## Sessions by channel group\n".to_string());
  md.push(channel_table(&bundle.compared_channels));

  let mut report = md.join("\n");
  report.push('\n');
  report
}

fn key_metrics(bundle: &ReportBundle) -> String {
  if bundle.current_queries.is_empty() && bundle.current_channels.is_empty() {
    return NO_DATA.to_string();
  }

  let current = bundle.current_totals();
  let previous = bundle.previous_totals();

  let ctr_change = match (current.click_through_rate, previous.click_through_rate) {
    (Some(now), Some(before)) => format!("{:+.2} pp", (now - before) * 100.0),
    _ => "n/a".to_string(),
  };
  let position_change = match (current.average_position, previous.average_position) {
    (Some(now), Some(before)) => format!("{:+.2}", now - before),
    _ => "n/a".to_string(),
  };
  let position = |value: Option<f64>| value.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "n/a".to_string());

  let rows = vec![
    volume_row("Clicks", current.clicks, previous.clicks),
    volume_row("Impressions", current.impressions, previous.impressions),
    vec![
      "CTR".to_string(),
      format_rate(current.click_through_rate),
      format_rate(previous.click_through_rate),
      ctr_change,
    ],
    vec![
      "Average position".to_string(),
      position(current.average_position),
      position(previous.average_position),
      position_change,
    ],
    volume_row("Sessions (all channels)", current.sessions, previous.sessions),
    volume_row("Users (all channels)", current.total_users, previous.total_users),
    volume_row(
      "Sessions (Organic)",
      organic_sessions(&bundle.current_channels),
      organic_sessions(&bundle.previous_channels),
    ),
  ];

  table(&["Metric", "This period", "Previous period", "Change"], rows)
}

/// Sessions across every organic channel group (search, social, video, shopping)
fn organic_sessions(channels: &Dataset) -> f64 {
  channels
    .iter()
    .filter(|record| record.key.contains(ORGANIC_MARKER))
    .map(|record| record.value(fields::SESSIONS))
    .sum()
}

fn volume_row(label: &str, current: f64, previous: f64) -> Vec<String> {
  vec![
    escape(label),
    format_number(current),
    format_number(previous),
    format_percent(percent_change(current, previous)),
  ]
}

fn search_table(dimension: &str, compared: &ComparedDataset, top_rows: usize) -> String {
  if compared.is_empty() {
    return NO_DATA.to_string();
  }

  let rows = compared
    .iter()
    .take(top_rows)
    .map(|record| {
      let clicks = change_of(record, fields::CLICKS);
      let position = change_of(record, fields::AVERAGE_POSITION);
      vec![
        escape(&record.key),
        format_number(clicks.current),
        previous_of(&clicks),
        format_signed(clicks.delta),
        format_percent(clicks.percent_change),
        format_number(record.current.value(fields::IMPRESSIONS)),
        format_rate(Some(record.current.value(fields::CLICK_THROUGH_RATE))),
        format!("{:.1}", position.current),
        position.previous.map(|_| format!("{:+.1}", position.delta)).unwrap_or_else(|| "n/a".to_string()),
      ]
    })
    .collect();

  table(
    &[dimension, "Clicks", "Previous", "Δ Clicks", "Δ %", "Impressions", "CTR", "Position", "Δ Position"],
    rows,
  )
}

fn channel_table(compared: &ComparedDataset) -> String {
  if compared.is_empty() {
    return NO_DATA.to_string();
  }

  let rows = compared
    .iter()
    .map(|record| {
      let sessions = change_of(record, fields::SESSIONS);
      let users = change_of(record, fields::TOTAL_USERS);
      vec![
        escape(&record.key),
        format_number(sessions.current),
        previous_of(&sessions),
        format_signed(sessions.delta),
        format_percent(sessions.percent_change),
        format_number(users.current),
        previous_of(&users),
      ]
    })
    .collect();

  table(&["Channel", "Sessions", "Previous", "Δ Sessions", "Δ %", "Users", "Previous users"], rows)
}

fn change_of(record: &ComparedRecord, metric: &str) -> MetricChange {
  record.change(metric).copied().unwrap_or(MetricChange {
    current: record.current.value(metric),
    previous: None,
    delta: record.current.value(metric),
    percent_change: None,
  })
}

fn previous_of(change: &MetricChange) -> String {
  change.previous.map(format_number).unwrap_or_else(|| "n/a".to_string())
}

fn table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
  let mut lines = Vec::with_capacity(rows.len() + 2);
  lines.push(format!("| {} |", headers.join(" | ")));

  let alignment: Vec<&str> = (0..headers.len()).map(|i| if i == 0 { ":---" } else { "---:" }).collect();
  lines.push(format!("| {} |", alignment.join(" | ")));

  for row in rows {
    lines.push(format!("| {} |", row.join(" | ")));
  }
  lines.join("\n")
}

fn escape(cell: &str) -> String {
  cell.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::period::ReportPeriod;
  use chrono::{TimeZone, Utc};
  use pulse_core::dataset::fields::{CHANNEL_METRICS, QUERY_METRICS};
  use pulse_core::{compare, Insights, MetricRecord};

  fn bundle(current_queries: Dataset, previous_queries: Dataset, channels: Dataset, insights: Insights) -> ReportBundle {
    let period = ReportPeriod::parse("2024-06-03", "2024-06-09").unwrap();
    ReportBundle {
      period,
      previous_period: period.previous(),
      compared_queries: compare(&current_queries, Some(&previous_queries), &QUERY_METRICS),
      compared_channels: compare(&channels, None, &CHANNEL_METRICS),
      current_queries,
      previous_queries,
      current_pages: Dataset::pages(),
      previous_pages: Dataset::pages(),
      compared_pages: compare(&Dataset::pages(), None, &QUERY_METRICS),
      current_channels: channels,
      previous_channels: Dataset::channels(),
      insights,
      generated_at: Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap(),
    }
  }

  fn options() -> MarkdownOptions<'static> {
    MarkdownOptions { top_rows: 20, chart: None }
  }

  #[test]
  fn test_empty_report_shows_no_data_markers() {
    let report = render(
      &bundle(Dataset::queries(), Dataset::queries(), Dataset::channels(), Insights::default()),
      &options(),
    );

    assert!(report.starts_with("# Weekly Search Report"));
    assert!(report.contains("2024-06-03 → 2024-06-09"));
    assert!(report.contains("2024-05-27 → 2024-06-02"));
    assert!(report.contains("2024-06-10 08:00 UTC"));
    assert_eq!(report.matches(NO_DATA).count(), 6);
    assert!(report.contains("## Top pages (by clicks)\n\n_No data_"));
    assert!(!report.contains("!["));
  }

  #[test]
  fn test_query_table_shows_changes() {
    let current = Dataset::queries().with_records(vec![
      MetricRecord::query("shoes", 100.0, 1000.0, 0.10, 5.0),
      MetricRecord::query("new|query", 7.0, 70.0, 0.10, 9.0),
    ]);
    let previous = Dataset::queries().with_records(vec![MetricRecord::query("shoes", 50.0, 1000.0, 0.05, 6.0)]);
    let insights = Insights { summary: vec!["Clicks rose.".to_string()], actions: vec!["Do a thing.".to_string()] };

    let report = render(&bundle(current, previous, Dataset::channels(), insights), &options());

    assert!(report.contains("- Clicks rose."));
    assert!(report.contains("1. Do a thing."));
    assert!(report.contains("| shoes | 100 | 50 | +50 | +100.0% | 1000 | 10.00% | 5.0 | -1.0 |"));
    assert!(report.contains("| new\\|query | 7 | n/a | +7 | n/a | 70 | 10.00% | 9.0 | n/a |"));
    assert!(report.contains("| Clicks | 107 | 50 | +114.0% |"));
    assert!(report.contains("## Sessions by channel group\n\n_No data_"));
  }

  #[test]
  fn test_query_table_respects_top_rows() {
    let current = Dataset::queries().with_records(
      (0..5).map(|i| MetricRecord::query(format!("q{}", i), 10.0 - i as f64, 100.0, 0.1, 3.0)).collect(),
    );
    let report = render(
      &bundle(current, Dataset::queries(), Dataset::channels(), Insights::default()),
      &MarkdownOptions { top_rows: 2, chart: None },
    );

    assert!(report.contains("| q1 |"));
    assert!(!report.contains("| q2 |"));
  }

  #[test]
  fn test_channel_rows_and_organic_kpi() {
    let channels = Dataset::channels().with_records(vec![
      MetricRecord::channel("Organic Search", 80.0, 60.0),
      MetricRecord::channel("Direct", 20.0, 18.0),
    ]);
    let report = render(&bundle(Dataset::queries(), Dataset::queries(), channels, Insights::default()), &options());

    assert!(report.contains("| Organic Search | 80 | n/a | +80 | n/a | 60 | n/a |"));
    assert!(report.contains("| Sessions (Organic) | 80 | 0 | n/a |"));
    assert!(report.contains("| Sessions (all channels) | 100 | 0 | n/a |"));
  }

  #[test]
  fn test_organic_kpi_sums_every_organic_group() {
    let channels = Dataset::channels().with_records(vec![
      MetricRecord::channel("Organic Search", 80.0, 60.0),
      MetricRecord::channel("Direct", 20.0, 18.0),
      MetricRecord::channel("Organic Social", 15.0, 12.0),
      MetricRecord::channel("Organic Video", 5.0, 5.0),
    ]);
    let mut bundle = bundle(Dataset::queries(), Dataset::queries(), channels, Insights::default());
    bundle.previous_channels = Dataset::channels().with_records(vec![
      MetricRecord::channel("Organic Search", 50.0, 40.0),
      MetricRecord::channel("Organic Shopping", 30.0, 20.0),
      MetricRecord::channel("Referral", 10.0, 10.0),
    ]);

    let report = render(&bundle, &options());
    assert!(report.contains("| Sessions (Organic) | 100 | 80 | +25.0% |"), "{report}");
  }

  #[test]
  fn test_page_table_and_chart_link() {
    let mut bundle = bundle(
      Dataset::queries().with_records(vec![MetricRecord::query("shoes", 10.0, 100.0, 0.1, 4.0)]),
      Dataset::queries(),
      Dataset::channels(),
      Insights::default(),
    );
    let pages = Dataset::pages().with_records(vec![MetricRecord::query("https://example.com/shoes", 9.0, 90.0, 0.1, 3.5)]);
    let previous_pages =
      Dataset::pages().with_records(vec![MetricRecord::query("https://example.com/shoes", 6.0, 80.0, 0.075, 4.0)]);
    bundle.compared_pages = compare(&pages, Some(&previous_pages), &QUERY_METRICS);
    bundle.current_pages = pages;
    bundle.previous_pages = previous_pages;

    let options = MarkdownOptions { top_rows: 20, chart: Some("2024-06-03_to_2024-06-09_top_queries.svg") };
    let report = render(&bundle, &options);

    assert!(report.contains("![Top queries by clicks](2024-06-03_to_2024-06-09_top_queries.svg)"));
    assert!(report.contains("| Page | Clicks | Previous |"));
    assert!(report.contains("| https://example.com/shoes | 9 | 6 | +3 | +50.0% | 90 | 10.00% | 3.5 | -0.5 |"));
  }
}
