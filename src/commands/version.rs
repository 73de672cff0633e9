// ABOUTME: Version commands: create a snapshot, list history, show a past state, diff two versions.
// ABOUTME: Output formats are JSON by default, with YAML for states and Markdown for diffs.

use anyhow::Context;
use clap::{Args, Subcommand, ValueEnum};
use moviehub_core::export::{export_diff_markdown, export_state_yaml};
use moviehub_core::model::DatasetId;
use moviehub_core::snapshot::VersionId;
use moviehub_store::{StorageManager, VersionError};

/// Arguments for version commands
#[derive(Debug, Args)]
pub struct VersionArgs {
    #[command(subcommand)]
    pub command: VersionCommand,
}

/// Rendering of a reconstructed state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StateFormat {
    #[default]
    Json,
    Yaml,
}

/// Rendering of a diff report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DiffFormat {
    #[default]
    Json,
    Markdown,
}

/// Version subcommands
#[derive(Debug, Subcommand)]
pub enum VersionCommand {
    /// Snapshot the dataset's current state as a new version
    Create {
        /// Dataset id
        #[arg(long)]
        dataset: DatasetId,
    },
    /// List a dataset's versions, newest first
    List {
        /// Dataset id
        #[arg(long)]
        dataset: DatasetId,
    },
    /// Show the dataset as it was at a version
    Show {
        /// Version id
        id: VersionId,
        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: StateFormat,
    },
    /// Compare two versions, older first
    Diff {
        /// Older version id
        from: VersionId,
        /// Newer version id
        to: VersionId,
        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: DiffFormat,
    },
    /// Write a version's YAML export under the home directory
    Export {
        /// Version id
        id: VersionId,
    },
}

/// Attach the "unavailable" wording used for versions that cannot be shown.
fn describe(err: VersionError, id: &VersionId) -> anyhow::Error {
    if err.is_unavailable() {
        anyhow::Error::new(err).context(format!("version {} is unavailable", id))
    } else {
        anyhow::Error::new(err).context(format!("failed to load version {}", id))
    }
}

/// Execute version commands
pub fn execute(args: &VersionArgs, storage: &StorageManager) -> anyhow::Result<()> {
    let versions = storage.versions();

    match &args.command {
        VersionCommand::Create { dataset } => {
            let record = storage
                .create_version_for(*dataset)
                .with_context(|| format!("failed to snapshot dataset {}", dataset))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        VersionCommand::List { dataset } => {
            storage.catalog().get_dataset(*dataset)?;
            let records = versions.ledger().list_versions_desc(*dataset)?;
            if records.is_empty() {
                println!("No versions yet.");
            }
            for r in records {
                println!(
                    "v{:<4} {}  {}",
                    r.version_number,
                    r.version_id,
                    r.created_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        VersionCommand::Show { id, format } => {
            let state = versions
                .load_dataset_from_version(id)
                .map_err(|e| describe(e, id))?;
            let rendered = match format {
                StateFormat::Json => serde_json::to_string_pretty(&state)?,
                StateFormat::Yaml => export_state_yaml(&state)?,
            };
            println!("{}", rendered);
        }
        VersionCommand::Diff { from, to, format } => {
            let older = versions.ledger().resolve(from).map_err(|e| describe(e.into(), from))?;
            let newer = versions.ledger().resolve(to).map_err(|e| describe(e.into(), to))?;
            if older.dataset_id != newer.dataset_id {
                tracing::warn!(
                    "comparing versions of different datasets ({} and {})",
                    older.dataset_id,
                    newer.dataset_id
                );
            }

            let report = versions.compare_version_ids(from, to)?;
            let rendered = match format {
                DiffFormat::Json => serde_json::to_string_pretty(&report)?,
                DiffFormat::Markdown => export_diff_markdown(
                    &report,
                    &older.version_number.to_string(),
                    &newer.version_number.to_string(),
                ),
            };
            println!("{}", rendered);
        }
        VersionCommand::Export { id } => {
            let path = storage.write_version_export(id)?;
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}
