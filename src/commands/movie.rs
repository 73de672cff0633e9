// ABOUTME: Movie commands: add, update, and remove single movies, or import a JSON file of movies.
// ABOUTME: Every change is followed by a new version snapshot unless --no-version is passed.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use moviehub_core::model::{DatasetId, MovieId, NewMovie};
use moviehub_store::StorageManager;

use super::snapshot_after_change;

/// Arguments for movie commands
#[derive(Debug, Args)]
pub struct MovieArgs {
    #[command(subcommand)]
    pub command: MovieCommand,
}

/// Editable movie fields accepted on the command line.
#[derive(Debug, Args)]
pub struct MovieFieldArgs {
    /// Title
    #[arg(long)]
    pub title: Option<String>,
    /// Release year
    #[arg(long)]
    pub year: Option<i32>,
    /// Original title
    #[arg(long)]
    pub original_title: Option<String>,
    /// Running time in minutes
    #[arg(long)]
    pub duration: Option<i32>,
    /// Country of production
    #[arg(long)]
    pub country: Option<String>,
    /// Director
    #[arg(long)]
    pub director: Option<String>,
    /// Genre
    #[arg(long)]
    pub genre: Option<String>,
    /// IMDb rating
    #[arg(long)]
    pub imdb_rating: Option<f64>,
}

/// Movie subcommands
#[derive(Debug, Subcommand)]
pub enum MovieCommand {
    /// Add one movie to a dataset
    Add {
        /// Dataset id
        #[arg(long)]
        dataset: DatasetId,
        #[command(flatten)]
        fields: MovieFieldArgs,
        /// Do not snapshot after the change
        #[arg(long)]
        no_version: bool,
    },
    /// Import movies from a JSON file holding an array of movie objects
    Import {
        /// Dataset id
        #[arg(long)]
        dataset: DatasetId,
        /// Path to the JSON file
        file: PathBuf,
        /// Do not snapshot after the change
        #[arg(long)]
        no_version: bool,
    },
    /// Change fields of an existing movie
    Update {
        /// Dataset id
        #[arg(long)]
        dataset: DatasetId,
        /// Movie id
        #[arg(long)]
        movie: MovieId,
        #[command(flatten)]
        fields: MovieFieldArgs,
        /// Do not snapshot after the change
        #[arg(long)]
        no_version: bool,
    },
    /// Remove a movie from a dataset
    Remove {
        /// Dataset id
        #[arg(long)]
        dataset: DatasetId,
        /// Movie id
        #[arg(long)]
        movie: MovieId,
        /// Do not snapshot after the change
        #[arg(long)]
        no_version: bool,
    },
}

impl MovieFieldArgs {
    fn apply(&self, movie: &mut NewMovie) {
        if let Some(title) = &self.title {
            movie.title = title.clone();
        }
        if let Some(year) = self.year {
            movie.year = year;
        }
        if self.original_title.is_some() {
            movie.original_title = self.original_title.clone();
        }
        if self.duration.is_some() {
            movie.duration = self.duration;
        }
        if self.country.is_some() {
            movie.country = self.country.clone();
        }
        if self.director.is_some() {
            movie.director = self.director.clone();
        }
        if self.genre.is_some() {
            movie.genre = self.genre.clone();
        }
        if self.imdb_rating.is_some() {
            movie.imdb_rating = self.imdb_rating;
        }
    }
}

/// Parse a JSON array of movies.
pub fn parse_movies(json: &str) -> anyhow::Result<Vec<NewMovie>> {
    serde_json::from_str(json).context("expected a JSON array of movie objects")
}

/// Execute movie commands
pub fn execute(args: &MovieArgs, storage: &StorageManager) -> anyhow::Result<()> {
    let catalog = storage.catalog();

    match &args.command {
        MovieCommand::Add {
            dataset,
            fields,
            no_version,
        } => {
            let title = fields.title.clone().context("--title is required")?;
            let year = fields.year.context("--year is required")?;
            let mut movie = NewMovie::new(title, year);
            fields.apply(&mut movie);

            let id = catalog.add_movie(*dataset, &movie)?;
            println!("added movie {} to dataset {}", id, dataset);
            snapshot_after_change(storage, *dataset, *no_version)?;
        }
        MovieCommand::Import {
            dataset,
            file,
            no_version,
        } => {
            let json = fs::read_to_string(file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let movies = parse_movies(&json)?;
            if movies.is_empty() {
                tracing::warn!("{} holds no movies; nothing imported", file.display());
                return Ok(());
            }

            let ids = catalog.import_movies(*dataset, &movies)?;
            println!("imported {} movies into dataset {}", ids.len(), dataset);
            snapshot_after_change(storage, *dataset, *no_version)?;
        }
        MovieCommand::Update {
            dataset,
            movie,
            fields,
            no_version,
        } => {
            let mut current = catalog
                .get_dataset(*dataset)?
                .movies
                .into_iter()
                .find(|m| m.id == *movie)
                .with_context(|| format!("movie {} not found in dataset {}", movie, dataset))?;
            fields.apply(&mut current.fields);

            catalog.update_movie(&current)?;
            println!("updated movie {} in dataset {}", movie, dataset);
            snapshot_after_change(storage, *dataset, *no_version)?;
        }
        MovieCommand::Remove {
            dataset,
            movie,
            no_version,
        } => {
            catalog.remove_movie(*dataset, *movie)?;
            println!("removed movie {} from dataset {}", movie, dataset);
            snapshot_after_change(storage, *dataset, *no_version)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_import_file() {
        let json = r#"[
            {"title": "Pulp Fiction", "year": 1994, "director": "Quentin Tarantino",
             "cast": ["John Travolta", "Uma Thurman"], "imdb_rating": 8.9},
            {"title": "Jackie Brown", "year": 1997}
        ]"#;

        let movies = parse_movies(json).unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].director.as_deref(), Some("Quentin Tarantino"));
        assert_eq!(movies[0].cast, Some(serde_json::json!(["John Travolta", "Uma Thurman"])));
        assert_eq!(movies[1].imdb_rating, None);
    }

    #[test]
    fn rejects_non_array_import() {
        assert!(parse_movies(r#"{"title": "Alone", "year": 2000}"#).is_err());
        assert!(parse_movies(r#"[{"year": 2000}]"#).is_err());
    }
}
