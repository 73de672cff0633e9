// ABOUTME: Entry point for the moviehub binary.
// ABOUTME: Loads .env and configuration, initializes tracing, opens the store, and runs the command.

mod commands;
mod config;

use anyhow::Context;
use clap::Parser;
use moviehub_store::StorageManager;
use tracing_subscriber::EnvFilter;

use commands::Cli;
use config::MovieHubConfig;

/// Log filter used when RUST_LOG is unset: the binary and both library crates.
const DEFAULT_LOG_FILTER: &str = "moviehub=info,moviehub_store=info,moviehub_core=info";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = MovieHubConfig::from_env(cli.home.clone()).context("invalid configuration")?;
    tracing::debug!("using home {}", config.home.display());

    let storage = StorageManager::open_with(config.home, &config.db_path, config.uploads_dir)
        .context("failed to open moviehub store")?;

    cli.execute(&storage)
}
