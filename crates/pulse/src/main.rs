use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use pulse::commands::{self, RunOptions};
use pulse::output;

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Pulse - weekly search-performance report\nSearch Console and GA4 week over week, with insights")]
#[command(version)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Config file (default: ./.pulse.json, ./pulse.json, then the user config dir)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

/// Reporting range; both or neither, defaulting to the last full week
#[derive(Args)]
struct RangeArgs {
  /// First day of the period (YYYY-MM-DD)
  #[arg(long, env = "START_DATE")]
  start: Option<String>,
  /// Last day of the period, inclusive (YYYY-MM-DD)
  #[arg(long, env = "END_DATE")]
  end: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch both periods, compare them and write the report
  Run {
    #[command(flatten)]
    range: RangeArgs,
    /// Search Console property
    #[arg(long, env = "GSC_SITE_URL")]
    site_url: Option<String>,
    /// GA4 property id
    #[arg(long, env = "GA4_PROPERTY_ID")]
    property_id: Option<String>,
    /// OAuth access token for the Google APIs
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
    /// Directory for the report and exports
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Read archived CSVs from this directory instead of calling the APIs
    #[arg(long)]
    offline: Option<PathBuf>,
  },
  /// Write a default config file
  Init {
    /// Where to write it
    #[arg(short, long, default_value = "pulse.json")]
    path: PathBuf,
    /// Overwrite an existing file
    #[arg(short, long)]
    force: bool,
  },
  /// Show the reporting period and its baseline
  Period {
    #[command(flatten)]
    range: RangeArgs,
  },
}

#[tokio::main]
async fn main() {
  if let Err(e) = run().await {
    output::error(&format!("{:#}", e));
    std::process::exit(1);
  }
}

async fn run() -> Result<()> {
  let cli = Cli::parse();
  output::init_tracing(cli.verbose);

  match cli.command {
    Commands::Run { range, site_url, property_id, access_token, output_dir, offline } => {
      let options = RunOptions {
        start: range.start,
        end: range.end,
        config: cli.config,
        site_url,
        property_id,
        access_token,
        output_dir,
        offline,
      };
      commands::run_report(options).await?;
    }
    Commands::Init { path, force } => {
      commands::init_config(&path, force)?;
    }
    Commands::Period { range } => {
      commands::show_period(range.start.as_deref(), range.end.as_deref())?;
    }
  }

  Ok(())
}
