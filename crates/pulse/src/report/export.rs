use anyhow::{Context, Result};
use csv::Writer;
use pulse_core::ComparedDataset;

/// CSV export of a compared dataset
///
/// One row per record: the key, then for every compared metric its current
/// value, previous value, delta and percentage change. Undefined values are
/// left empty.
pub fn compared_csv(compared: &ComparedDataset) -> Result<String> {
  let mut wtr = Writer::from_writer(vec![]);

  let mut header = vec![compared.dimension.clone()];
  for metric in &compared.metrics {
    header.push(metric.clone());
    header.push(format!("{metric}_previous"));
    header.push(format!("{metric}_delta"));
    header.push(format!("{metric}_percent_change"));
  }
  wtr.write_record(&header)?;

  for record in compared.iter() {
    let mut row = vec![record.key.clone()];
    for metric in &compared.metrics {
      match record.change(metric) {
        Some(change) => {
          row.push(change.current.to_string());
          row.push(optional(change.previous));
          row.push(change.delta.to_string());
          row.push(optional(change.percent_change));
        }
        None => row.extend(std::iter::repeat(String::new()).take(4)),
      }
    }
    wtr.write_record(&row)?;
  }

  let data = wtr.into_inner().map_err(|e| anyhow::anyhow!("CSV writer error: {}", e))?;
  String::from_utf8(data).context("CSV export is not valid UTF-8")
}

fn optional(value: Option<f64>) -> String {
  value.map(|v| v.to_string()).unwrap_or_default()
}
