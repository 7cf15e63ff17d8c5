//! Top-queries bar chart
//!
//! Rendered as SVG so the report directory stays self-contained and no
//! font rasterizer is needed at build time.

use anyhow::{anyhow, Result};
use plotters::prelude::*;
use pulse_core::{fields, Dataset};

/// Queries shown in the chart
pub const CHART_ROWS: usize = 10;

const WIDTH: u32 = 960;
const ROW_HEIGHT: u32 = 36;
const LABEL_CHARS: usize = 40;
const BAR_COLOR: RGBColor = RGBColor(66, 133, 244);

/// Horizontal bars of the busiest queries by clicks, highest on top
///
/// `None` when there are no queries to plot.
pub fn top_queries_svg(queries: &Dataset) -> Result<Option<String>> {
  if queries.is_empty() {
    return Ok(None);
  }

  let rows: Vec<(String, f64)> = queries
    .sorted_by(fields::CLICKS)
    .iter()
    .take(CHART_ROWS)
    .map(|record| (shorten(&record.key), record.value(fields::CLICKS)))
    .collect();
  let slots = rows.len() as u32;
  let upper = rows.iter().map(|(_, clicks)| *clicks).fold(1.0, f64::max) * 1.05;

  let mut svg = String::new();
  {
    let root = SVGBackend::with_string(&mut svg, (WIDTH, 120 + ROW_HEIGHT * slots)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_error)?;

    let mut chart = ChartBuilder::on(&root)
      .caption("Top Queries by Clicks", ("sans-serif", 24))
      .margin(16)
      .x_label_area_size(32)
      .y_label_area_size(280)
      .build_cartesian_2d(0f64..upper, (0u32..slots).into_segmented())
      .map_err(chart_error)?;

    // Slot 0 is the bottom of the chart, so the busiest query takes the last slot
    let label = |value: &SegmentValue<u32>| match value {
      SegmentValue::CenterOf(slot) | SegmentValue::Exact(slot) if *slot < slots => {
        rows[(slots - 1 - slot) as usize].0.clone()
      }
      _ => String::new(),
    };

    chart
      .configure_mesh()
      .disable_y_mesh()
      .y_labels(rows.len())
      .y_label_formatter(&label)
      .x_desc("Clicks")
      .draw()
      .map_err(chart_error)?;

    chart
      .draw_series(rows.iter().enumerate().map(|(index, (_, clicks))| {
        let slot = slots - 1 - index as u32;
        Rectangle::new([(0.0, SegmentValue::Exact(slot)), (*clicks, SegmentValue::Exact(slot + 1))], BAR_COLOR.filled())
      }))
      .map_err(chart_error)?;

    root.present().map_err(chart_error)?;
  }

  Ok(Some(svg))
}

fn shorten(key: &str) -> String {
  if key.chars().count() <= LABEL_CHARS {
    return key.to_string();
  }
  let mut short: String = key.chars().take(LABEL_CHARS - 1).collect();
  short.push('…');
  short
}

fn chart_error(e: impl std::fmt::Display) -> anyhow::Error {
  anyhow!("Failed to render chart: {}", e)
}
