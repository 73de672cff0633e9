// ABOUTME: Dataset management commands: create, list, show, update, and delete.
// ABOUTME: Metadata edits are followed by a new version snapshot unless --no-version is passed.

use anyhow::Context;
use clap::{Args, Subcommand};
use moviehub_core::model::{DatasetId, DatasetMetadata, PublicationType, UserId};
use moviehub_store::StorageManager;

use super::snapshot_after_change;

/// Arguments for dataset commands
#[derive(Debug, Args)]
pub struct DatasetArgs {
    #[command(subcommand)]
    pub command: DatasetCommand,
}

/// Metadata fields shared by create and update.
#[derive(Debug, Args)]
pub struct MetadataArgs {
    /// Dataset title
    #[arg(long)]
    pub title: Option<String>,
    /// Dataset description
    #[arg(long)]
    pub description: Option<String>,
    /// Publication type, by value ("article") or name ("JOURNAL_ARTICLE")
    #[arg(long)]
    pub publication_type: Option<PublicationType>,
    /// DOI of the related publication
    #[arg(long)]
    pub publication_doi: Option<String>,
    /// DOI of the dataset itself
    #[arg(long)]
    pub dataset_doi: Option<String>,
    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,
}

/// Dataset subcommands
#[derive(Debug, Subcommand)]
pub enum DatasetCommand {
    /// Create a new dataset
    Create {
        /// Owning user id
        #[arg(long)]
        owner: UserId,
        #[command(flatten)]
        metadata: MetadataArgs,
        /// Do not snapshot the new dataset
        #[arg(long)]
        no_version: bool,
    },
    /// List datasets
    List {
        /// Only datasets owned by this user
        #[arg(long)]
        owner: Option<UserId>,
    },
    /// Show a dataset summary, or the dataset and its movies as JSON
    Show {
        /// Dataset id
        id: DatasetId,
        /// Print the full dataset as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change dataset metadata
    Update {
        /// Dataset id
        id: DatasetId,
        #[command(flatten)]
        metadata: MetadataArgs,
        /// Do not snapshot after the change
        #[arg(long)]
        no_version: bool,
    },
    /// Delete a dataset with its movies, versions, and artifacts
    Delete {
        /// Dataset id
        id: DatasetId,
    },
}

impl MetadataArgs {
    /// Apply the given fields on top of `base`. Empty strings clear optional fields.
    fn apply(&self, mut base: DatasetMetadata) -> DatasetMetadata {
        if let Some(title) = &self.title {
            base.title = title.clone();
        }
        if let Some(description) = &self.description {
            base.description = description.clone();
        }
        if self.publication_type.is_some() {
            base.publication_type = self.publication_type;
        }
        if let Some(doi) = &self.publication_doi {
            base.publication_doi = non_empty(doi);
        }
        if let Some(doi) = &self.dataset_doi {
            base.dataset_doi = non_empty(doi);
        }
        if let Some(tags) = &self.tags {
            base.tags = non_empty(tags);
        }
        base
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Execute dataset commands
pub fn execute(args: &DatasetArgs, storage: &StorageManager) -> anyhow::Result<()> {
    let catalog = storage.catalog();

    match &args.command {
        DatasetCommand::Create {
            owner,
            metadata,
            no_version,
        } => {
            let title = metadata
                .title
                .clone()
                .context("--title is required when creating a dataset")?;
            let base = DatasetMetadata::new(title, metadata.description.clone().unwrap_or_default());
            let id = catalog.create_dataset(*owner, &metadata.apply(base))?;
            println!("created dataset {}", id);
            snapshot_after_change(storage, id, *no_version)?;
        }
        DatasetCommand::List { owner } => {
            let summaries = match owner {
                Some(owner) => catalog.list_datasets_by_owner(*owner)?,
                None => catalog.list_datasets()?,
            };
            if summaries.is_empty() {
                println!("No datasets found.");
            }
            for s in summaries {
                println!(
                    "{:>5}  user {:<5} {:>4} movies  {}  {}",
                    s.id,
                    s.owner_id,
                    s.movies_count,
                    s.created_at.format("%Y-%m-%d %H:%M"),
                    s.title
                );
            }
        }
        DatasetCommand::Show { id, json } => {
            let dataset = catalog
                .get_dataset(*id)
                .with_context(|| format!("failed to load dataset {}", id))?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&dataset)?);
                return Ok(());
            }

            let latest = storage.versions().ledger().latest_version(*id)?;
            println!("#{} {}", dataset.id, dataset.metadata.title);
            println!("  owner:            user {}", dataset.owner_id);
            println!(
                "  publication type: {}",
                dataset
                    .metadata
                    .publication_type
                    .map(|t| t.display_name())
                    .unwrap_or_else(|| "-".to_string())
            );
            println!("  tags:             {}", dataset.metadata.tag_list().join(", "));
            println!("  movies:           {}", catalog.movie_count(*id)?);
            match latest {
                Some(v) => println!("  latest version:   v{} ({})", v.version_number, v.version_id),
                None => println!("  latest version:   none"),
            }
        }
        DatasetCommand::Update {
            id,
            metadata,
            no_version,
        } => {
            let current = catalog.get_dataset(*id)?.metadata;
            let updated = metadata.apply(current.clone());
            if updated == current {
                tracing::warn!("no metadata changes given for dataset {}", id);
                return Ok(());
            }
            catalog.update_metadata(*id, &updated)?;
            println!("updated dataset {}", id);
            snapshot_after_change(storage, *id, *no_version)?;
        }
        DatasetCommand::Delete { id } => {
            storage
                .delete_dataset(*id)
                .with_context(|| format!("failed to delete dataset {}", id))?;
            println!("deleted dataset {}", id);
        }
    }

    Ok(())
}
