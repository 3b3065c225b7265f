//! pocketcache - cached JSON fetching and offline expense tracking from the
//! command line.

mod cli;
mod commands;

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command};
use pocketcache_core::Config;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let config = Config::load()?.with_env_overrides();
    info!("pocketcache starting");

    match cli.command {
        Command::Fetch {
            url,
            key,
            min_latency_ms,
            refresh,
        } => commands::fetch::run(&config, url, key, min_latency_ms, refresh).await,
        Command::Cache { action } => commands::fetch::cache(&config, action),
        Command::Expense { action } => commands::expense::run(&config, action).await,
        Command::Backup { action } => commands::backup::run(&config, action).await,
    }
}
