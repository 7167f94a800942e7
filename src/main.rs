//! # Kayak Launch Planner Entry Point
//!
//! Fetches tide, current, wind and ferry data for the configured launch site,
//! scores the day (or week) and prints the recommended launch windows.
//!
//! Reports go to stdout; logs go to stderr so `--json` output stays clean.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use launch_window_lib::config::Config;
use launch_window_lib::providers::LiveProvider;
use launch_window_lib::report::{self, DayReport, WeekReport};
use launch_window_lib::schedule::{self, ViewMode};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Recommend safe kayak launch windows from tide, current, wind and ferry data
#[derive(Parser, Debug)]
#[command(name = "kayak-launch-planner")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Date to plan (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Plan the week starting at --date instead of a single day
    #[arg(short, long)]
    week: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = launch_window_lib::config::CONFIG_FILE)]
    config: PathBuf,

    /// Print the full plan as JSON
    #[arg(long)]
    json: bool,

    /// Alternative windows listed after the best one
    #[arg(long, default_value_t = 2)]
    alternatives: usize,

    /// Write the default configuration to --config and exit
    #[arg(long)]
    init_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Main application entry point.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if cli.init_config {
        Config::default()
            .save_to_path(&cli.config)
            .with_context(|| format!("failed to write {}", cli.config.display()))?;
        println!("Wrote default configuration to {}", cli.config.display());
        return Ok(());
    }

    let config = Config::load_from_path(&cli.config);
    let start = cli.date.unwrap_or_else(|| Local::now().date_naive());
    let mode = if cli.week {
        ViewMode::Weekly
    } else {
        ViewMode::Daily
    };
    let dates = schedule::date_range(start, mode, config.schedule.week_length);
    info!(%start, days = dates.len(), site = %config.station.name, "planning");

    let provider = Arc::new(
        LiveProvider::from_config(&config).context("failed to build HTTP providers")?,
    );

    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let week = rt
        .block_on(schedule::plan(&dates, provider, &config))
        .context("planning failed")?;

    if cli.json {
        println!("{}", report::to_json(&week).context("failed to serialize plan")?);
        return Ok(());
    }

    let site = config.station.name.as_str();
    match (mode, week.days.first()) {
        (ViewMode::Daily, Some(plan)) => print!(
            "{}",
            DayReport {
                site,
                plan,
                alternatives: cli.alternatives,
            }
        ),
        _ => print!("{}", WeekReport { site, week: &week }),
    }
    Ok(())
}
