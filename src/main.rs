//! # Daily Wisdom CLI (`wisdom`)
//!
//! ## Usage
//!
//! ```bash
//! wisdom --config ./config/wisdom.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `wisdom chapter [DAY]` | Print the chapter record as JSON |
//! | `wisdom sources` | List scripture sources and their status |
//! | `wisdom serve` | Start the HTTP API |
//!
//! Logs go to stderr; set `RUST_LOG=debug` for more detail.

use anyhow::Context;
use clap::{Parser, Subcommand};
use daily_wisdom::{config, pipeline::DailyPipeline, server, sources};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Daily Wisdom: a chapter of Proverbs a day, with an AI reflection.
#[derive(Parser)]
#[command(name = "wisdom", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When the file does not exist, built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/wisdom.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the chapter record for a day as JSON.
    Chapter {
        /// Chapter number. Defaults to today's day of the month.
        day: Option<u32>,

        /// Also print which source supplied the text.
        #[arg(long)]
        with_source: bool,

        /// Give up after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List scripture sources and their configuration status.
    Sources,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::warn!(
            "config file {} not found, using defaults",
            cli.config.display()
        );
        config::Config::minimal()
    };

    match cli.command {
        Commands::Chapter {
            day,
            with_source,
            timeout,
        } => {
            let pipeline = DailyPipeline::from_config(&cfg)?;
            let day = day.unwrap_or_else(|| pipeline.today());

            if with_source {
                let report = match timeout {
                    Some(secs) => {
                        pipeline
                            .fetch_report_within(day, Duration::from_secs(secs))
                            .await?
                    }
                    None => pipeline.fetch_report(day).await?,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            let content = match timeout {
                Some(secs) => pipeline.fetch_within(day, Duration::from_secs(secs)).await,
                None => pipeline.fetch(day).await,
            }
            .with_context(|| format!("no content for chapter {}", day))?;
            println!("{}", serde_json::to_string_pretty(&content)?);
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
