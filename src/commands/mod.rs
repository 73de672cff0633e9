// ABOUTME: CLI command definitions and dispatch for the moviehub binary.
// ABOUTME: Each subcommand group lives in its own module and runs against a StorageManager.

pub mod dataset;
pub mod movie;
pub mod version;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use moviehub_core::model::DatasetId;
use moviehub_store::StorageManager;

/// MovieHub: curated movie datasets with immutable versions
#[derive(Debug, Parser)]
#[command(name = "moviehub", version, about, long_about = None)]
pub struct Cli {
    /// Data directory (overrides MOVIEHUB_HOME)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Dataset management
    Dataset(dataset::DatasetArgs),
    /// Movies inside a dataset
    Movie(movie::MovieArgs),
    /// Dataset versions: snapshots, history, and diffs
    Version(version::VersionArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(&self, storage: &StorageManager) -> anyhow::Result<()> {
        match &self.command {
            Commands::Dataset(args) => dataset::execute(args, storage),
            Commands::Movie(args) => movie::execute(args, storage),
            Commands::Version(args) => version::execute(args, storage),
        }
    }
}

/// Snapshot a dataset after a mutation unless the caller opted out.
pub(crate) fn snapshot_after_change(
    storage: &StorageManager,
    dataset_id: DatasetId,
    skip: bool,
) -> anyhow::Result<()> {
    if skip {
        return Ok(());
    }
    let version = storage.create_version_for(dataset_id)?;
    println!(
        "dataset {} is now at version {} ({})",
        dataset_id, version.version_number, version.version_id
    );
    Ok(())
}
