use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fundnav::config::{default_config_path, ResolvedConfig};
use fundnav::pipeline::NavPipeline;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "fundnav")]
#[command(version, about = "Compute and publish per-minute NAV for PMs, groups and funds")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the NAV pipeline once for the last elapsed minute (default)
    Run,
    /// Show the resolved configuration
    Config,
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .json(),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load fundnav config: {}", config_path.display()))?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Config => {
            println!("Config file: {}", config_path.display());
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Command::Run => {
            let pipeline = NavPipeline::from_config(&config);
            // Exit cleanly on failure. The scheduler owns retries.
            match pipeline.run_once().await {
                Ok(outcome) => info!(
                    reference = %outcome.reference_timestamp,
                    rows = outcome.rows_written(),
                    "NAV run completed"
                ),
                Err(err) => error!(error = %err, "NAV run failed"),
            }
        }
    }

    Ok(())
}
