//! ticketflow - Jira backlog flow analytics
//!
//! Fetches tickets from Jira, caches enriched snapshots, and prints
//! priority and flow analytics from the cache.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Cache: $XDG_DATA_HOME/ticketflow/cache/ (~/.local/share/ticketflow/cache/)
//! - Logs: $XDG_STATE_HOME/ticketflow/ticketflow.log (~/.local/state/ticketflow/ticketflow.log)
//! - Config: $XDG_CONFIG_HOME/ticketflow/config.toml (~/.config/ticketflow/config.toml)

mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use ticketflow_core::analytics::Interval;
use ticketflow_core::fetch::JiraClient;
use ticketflow_core::{Config, DashboardService, Dataset, RefreshReport};

#[derive(Parser)]
#[command(name = "ticketflow")]
#[command(about = "Jira backlog flow analytics")]
#[command(version)]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/ticketflow/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch tickets from Jira and update the cache
    Refresh {
        /// Refresh the historical dataset instead of the current one
        #[arg(long, conflicts_with = "all")]
        historical: bool,

        /// Refresh current and historical datasets together
        #[arg(long)]
        all: bool,
    },

    /// Print analytics from the cache without contacting Jira
    Report {
        /// Bucket width for the period table
        #[arg(short, long, default_value = "weekly")]
        interval: Interval,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Report on the historical dataset
        #[arg(long)]
        historical: bool,
    },

    /// Show configuration and cache status
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn dataset(historical: bool) -> Dataset {
    if historical {
        Dataset::Historical
    } else {
        Dataset::Current
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let config_path = args.config.clone().unwrap_or_else(Config::config_path);
    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    let _log_guard = ticketflow_core::logging::init(&config.logging.with_verbosity(args.verbose))
        .context("failed to initialize logging")?;

    tracing::info!(command = command_name(&args.command), "ticketflow starting");

    let service = DashboardService::from_config(config).context("failed to create Jira client")?;
    let now = chrono::Utc::now();

    match args.command {
        Command::Refresh { historical, all } => {
            if all {
                refresh_all(&service, now).await
            } else {
                let report = service
                    .refresh(dataset(historical), now)
                    .await
                    .context("refresh failed")?;
                println!("{}", output::refresh_line(&report));
                Ok(())
            }
        }
        Command::Report {
            interval,
            format,
            historical,
        } => {
            let dataset = dataset(historical);
            let dashboard = service
                .cached_dashboard(dataset, now)
                .await
                .with_context(|| {
                    format!("no cached {} snapshot; run 'ticketflow refresh' first", dataset)
                })?;
            match format {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&dashboard)
                        .context("failed to serialize dashboard")?;
                    println!("{}", json);
                }
                OutputFormat::Text => {
                    print!("{}", output::render_text(dataset, &dashboard, interval))
                }
            }
            Ok(())
        }
        Command::Status => {
            print!("{}", output::render_status(&service, &config_path).await);
            Ok(())
        }
    }
}

async fn refresh_all(
    service: &DashboardService<JiraClient>,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<()> {
    let (current, historical) = service.refresh_all(now).await;

    let mut failures = 0;
    let mut show = |result: ticketflow_core::Result<RefreshReport>| match result {
        Ok(report) => println!("{}", output::refresh_line(&report)),
        Err(e) => {
            eprintln!("Error: {}", e);
            failures += 1;
        }
    };
    show(current);
    match historical {
        Some(result) => show(result),
        None => println!("historical: skipped (jira.historical_jql not set)"),
    }

    if failures > 0 {
        anyhow::bail!("{} dataset(s) failed to refresh", failures);
    }
    Ok(())
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Refresh { .. } => "refresh",
        Command::Report { .. } => "report",
        Command::Status => "status",
    }
}
