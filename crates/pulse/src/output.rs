//! Terminal output and log setup
//!
//! Status lines go to stderr with a colored level prefix so stdout stays
//! free for anything piped. Library code logs through `tracing`; the
//! subscriber is installed once by the binary.

use colored::*;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Install the tracing subscriber; `RUST_LOG` wins over the verbosity flag
pub fn init_tracing(verbose: bool) {
  let default_filter = if verbose { "pulse=debug,pulse_core=debug,info" } else { "pulse=info,pulse_core=warn,warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

  let _ = tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
    .with(filter)
    .try_init();
}

fn format_prefix(color: Color, prefix: &str) -> String {
  format!("[{}]{:<width$}", prefix.color(color).bold(), "", width = 7usize.saturating_sub(prefix.len() + 2))
}

fn log_with(color: Color, prefix: &str, message: &str) {
  let prefix = format_prefix(color, prefix);
  for line in message.lines() {
    eprintln!("{prefix} {line}");
  }
}

pub fn info(message: &str) {
  log_with(Color::Blue, "info", message);
}

pub fn warn(message: &str) {
  log_with(Color::Yellow, "warn", message);
}

pub fn error(message: &str) {
  log_with(Color::Red, "error", message);
}

pub fn success(message: &str) {
  log_with(Color::Green, "done", message);
}

/// Message framed by a rule line above and below
pub fn banner(message: &str) {
  let width = message.lines().map(|line| line.chars().count()).max().unwrap_or(0).clamp(20, 80);
  let rule = "=".repeat(width);
  eprintln!("{}", rule.blue().bold());
  for line in message.lines() {
    eprintln!("{}", line.bold());
  }
  eprintln!("{}", rule.blue().bold());
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_prefix_pads_short_levels() {
    colored::control::set_override(false);
    assert_eq!(format_prefix(Color::Blue, "info"), "[info] ");
    assert_eq!(format_prefix(Color::Red, "error"), "[error]");
  }

  #[test]
  fn test_logging_functions_accept_multiline() {
    info("first\nsecond");
    warn("careful");
    error("broken\nstill broken");
    success("finished");
    banner("Weekly Search Report\n2024-06-03 → 2024-06-09");
  }
}
