// ABOUTME: SQLite-backed catalog of live movie datasets and their movies.
// ABOUTME: Provides dataset and movie CRUD and loads MovieDataset handles for the snapshot writer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use moviehub_core::model::{
    DatasetId, DatasetMetadata, Movie, MovieDataset, MovieId, NewMovie, PublicationType, UserId,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;

use crate::db::{Database, DatabaseError, conversion_error, timestamp_column};

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("dataset not found: {0}")]
    DatasetNotFound(DatasetId),

    #[error("movie {movie_id} not found in dataset {dataset_id}")]
    MovieNotFound {
        dataset_id: DatasetId,
        movie_id: MovieId,
    },

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        CatalogError::Database(err.into())
    }
}

/// A dataset row for list queries.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub id: DatasetId,
    pub owner_id: UserId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub movies_count: usize,
}

const SUMMARY_SELECT: &str = "SELECT d.id, d.owner_id, d.title, d.created_at,
        (SELECT COUNT(*) FROM movies m WHERE m.dataset_id = d.id)
     FROM datasets d";

const MOVIE_COLUMNS: &str = "id, dataset_id, title, original_title, year, duration, country,
     director, production_company, genre, synopsis, imdb_rating, imdb_votes, poster_url,
     poster_local_path, screenplay_json, cast_json, awards_json";

/// Live datasets and movies. This is the mutable side of the system; the
/// version ledger only ever reads from it through `MovieDataset`.
pub struct Catalog {
    db: Arc<Database>,
}

impl Catalog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new dataset owned by `owner_id` and return its id.
    pub fn create_dataset(
        &self,
        owner_id: UserId,
        metadata: &DatasetMetadata,
    ) -> Result<DatasetId, CatalogError> {
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO datasets (owner_id, created_at, title, description, publication_type,
                                   publication_doi, dataset_doi, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                owner_id,
                Utc::now().to_rfc3339(),
                metadata.title,
                metadata.description,
                metadata.publication_type.map(PublicationType::value),
                metadata.publication_doi,
                metadata.dataset_doi,
                metadata.tags,
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!("created dataset {} for user {}", id, owner_id);
        Ok(id)
    }

    /// Load a dataset with all of its movies, in insertion order.
    pub fn get_dataset(&self, dataset_id: DatasetId) -> Result<MovieDataset, CatalogError> {
        let conn = self.db.lock()?;

        let header = conn
            .query_row(
                "SELECT id, owner_id, created_at, title, description, publication_type,
                        publication_doi, dataset_doi, tags
                 FROM datasets WHERE id = ?1",
                params![dataset_id],
                |row| {
                    let publication_type = match row.get::<_, Option<String>>(5)? {
                        Some(raw) => Some(
                            raw.parse::<PublicationType>()
                                .map_err(|e| conversion_error(5, e))?,
                        ),
                        None => None,
                    };
                    Ok((
                        row.get::<_, DatasetId>(0)?,
                        row.get::<_, UserId>(1)?,
                        timestamp_column(row, 2)?,
                        DatasetMetadata {
                            title: row.get(3)?,
                            description: row.get(4)?,
                            publication_type,
                            publication_doi: row.get(6)?,
                            dataset_doi: row.get(7)?,
                            tags: row.get(8)?,
                        },
                    ))
                },
            )
            .optional()?;

        let (id, owner_id, created_at, metadata) =
            header.ok_or(CatalogError::DatasetNotFound(dataset_id))?;
        let movies = load_movies(&conn, id)?;

        Ok(MovieDataset {
            id,
            owner_id,
            created_at,
            metadata,
            movies,
        })
    }

    /// List every dataset, newest first.
    pub fn list_datasets(&self) -> Result<Vec<DatasetSummary>, CatalogError> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!("{SUMMARY_SELECT} ORDER BY d.created_at DESC, d.id DESC"))?;
        let rows = stmt.query_map([], summary_from_row)?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    /// List the datasets owned by one user, newest first.
    pub fn list_datasets_by_owner(
        &self,
        owner_id: UserId,
    ) -> Result<Vec<DatasetSummary>, CatalogError> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{SUMMARY_SELECT} WHERE d.owner_id = ?1 ORDER BY d.created_at DESC, d.id DESC"
        ))?;
        let rows = stmt.query_map(params![owner_id], summary_from_row)?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    /// Replace a dataset's descriptive metadata.
    pub fn update_metadata(
        &self,
        dataset_id: DatasetId,
        metadata: &DatasetMetadata,
    ) -> Result<(), CatalogError> {
        let conn = self.db.lock()?;
        let changed = conn.execute(
            "UPDATE datasets SET title = ?1, description = ?2, publication_type = ?3,
                                 publication_doi = ?4, dataset_doi = ?5, tags = ?6
             WHERE id = ?7",
            params![
                metadata.title,
                metadata.description,
                metadata.publication_type.map(PublicationType::value),
                metadata.publication_doi,
                metadata.dataset_doi,
                metadata.tags,
                dataset_id,
            ],
        )?;
        if changed == 0 {
            return Err(CatalogError::DatasetNotFound(dataset_id));
        }
        Ok(())
    }

    /// Add one movie to a dataset and return its id.
    pub fn add_movie(&self, dataset_id: DatasetId, movie: &NewMovie) -> Result<MovieId, CatalogError> {
        let conn = self.db.lock()?;
        ensure_dataset(&conn, dataset_id)?;
        insert_movie(&conn, dataset_id, movie)
    }

    /// Add many movies in one transaction. Either all are inserted or none.
    pub fn import_movies(
        &self,
        dataset_id: DatasetId,
        movies: &[NewMovie],
    ) -> Result<Vec<MovieId>, CatalogError> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;
        ensure_dataset(&tx, dataset_id)?;

        let mut ids = Vec::with_capacity(movies.len());
        for movie in movies {
            ids.push(insert_movie(&tx, dataset_id, movie)?);
        }
        tx.commit()?;

        tracing::info!("imported {} movies into dataset {}", ids.len(), dataset_id);
        Ok(ids)
    }

    /// Overwrite every editable field of an existing movie.
    pub fn update_movie(&self, movie: &Movie) -> Result<(), CatalogError> {
        let conn = self.db.lock()?;
        let f = &movie.fields;
        let changed = conn.execute(
            "UPDATE movies SET title = ?1, original_title = ?2, year = ?3, duration = ?4,
                country = ?5, director = ?6, production_company = ?7, genre = ?8, synopsis = ?9,
                imdb_rating = ?10, imdb_votes = ?11, poster_url = ?12, poster_local_path = ?13,
                screenplay_json = ?14, cast_json = ?15, awards_json = ?16
             WHERE id = ?17 AND dataset_id = ?18",
            params![
                f.title,
                f.original_title,
                f.year,
                f.duration,
                f.country,
                f.director,
                f.production_company,
                f.genre,
                f.synopsis,
                f.imdb_rating,
                f.imdb_votes,
                f.poster_url,
                f.poster_local_path,
                json_column(&f.screenplay)?,
                json_column(&f.cast)?,
                json_column(&f.awards)?,
                movie.id,
                movie.dataset_id,
            ],
        )?;
        if changed == 0 {
            return Err(CatalogError::MovieNotFound {
                dataset_id: movie.dataset_id,
                movie_id: movie.id,
            });
        }
        Ok(())
    }

    /// Remove one movie from a dataset.
    pub fn remove_movie(&self, dataset_id: DatasetId, movie_id: MovieId) -> Result<(), CatalogError> {
        let conn = self.db.lock()?;
        let changed = conn.execute(
            "DELETE FROM movies WHERE id = ?1 AND dataset_id = ?2",
            params![movie_id, dataset_id],
        )?;
        if changed == 0 {
            return Err(CatalogError::MovieNotFound {
                dataset_id,
                movie_id,
            });
        }
        Ok(())
    }

    /// Delete a dataset. Its movies and version ledger rows go with it.
    pub fn delete_dataset(&self, dataset_id: DatasetId) -> Result<(), CatalogError> {
        let conn = self.db.lock()?;
        let changed = conn.execute("DELETE FROM datasets WHERE id = ?1", params![dataset_id])?;
        if changed == 0 {
            return Err(CatalogError::DatasetNotFound(dataset_id));
        }
        tracing::info!("deleted dataset {}", dataset_id);
        Ok(())
    }

    pub fn movie_count(&self, dataset_id: DatasetId) -> Result<usize, CatalogError> {
        let conn = self.db.lock()?;
        ensure_dataset(&conn, dataset_id)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM movies WHERE dataset_id = ?1",
            params![dataset_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn ensure_dataset(conn: &Connection, dataset_id: DatasetId) -> Result<(), CatalogError> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM datasets WHERE id = ?1",
            params![dataset_id],
            |_| Ok(()),
        )
        .optional()?;
    exists.ok_or(CatalogError::DatasetNotFound(dataset_id))
}

fn insert_movie(conn: &Connection, dataset_id: DatasetId, movie: &NewMovie) -> Result<MovieId, CatalogError> {
    conn.execute(
        &format!(
            "INSERT INTO movies ({MOVIE_COLUMNS})
             VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
        ),
        params![
            dataset_id,
            movie.title,
            movie.original_title,
            movie.year,
            movie.duration,
            movie.country,
            movie.director,
            movie.production_company,
            movie.genre,
            movie.synopsis,
            movie.imdb_rating,
            movie.imdb_votes,
            movie.poster_url,
            movie.poster_local_path,
            json_column(&movie.screenplay)?,
            json_column(&movie.cast)?,
            json_column(&movie.awards)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn load_movies(conn: &Connection, dataset_id: DatasetId) -> Result<Vec<Movie>, CatalogError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MOVIE_COLUMNS} FROM movies WHERE dataset_id = ?1 ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map(params![dataset_id], movie_from_row)?;

    let mut movies = Vec::new();
    for row in rows {
        movies.push(row?);
    }
    Ok(movies)
}

fn movie_from_row(row: &Row<'_>) -> rusqlite::Result<Movie> {
    Ok(Movie {
        id: row.get(0)?,
        dataset_id: row.get(1)?,
        fields: NewMovie {
            title: row.get(2)?,
            original_title: row.get(3)?,
            year: row.get(4)?,
            duration: row.get(5)?,
            country: row.get(6)?,
            director: row.get(7)?,
            production_company: row.get(8)?,
            genre: row.get(9)?,
            synopsis: row.get(10)?,
            imdb_rating: row.get(11)?,
            imdb_votes: row.get(12)?,
            poster_url: row.get(13)?,
            poster_local_path: row.get(14)?,
            screenplay: json_value(row, 15)?,
            cast: json_value(row, 16)?,
            awards: json_value(row, 17)?,
        },
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<DatasetSummary> {
    let count: i64 = row.get(4)?;
    Ok(DatasetSummary {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        created_at: timestamp_column(row, 3)?,
        movies_count: count as usize,
    })
}

fn json_column(value: &Option<serde_json::Value>) -> Result<Option<String>, CatalogError> {
    Ok(value.as_ref().map(serde_json::to_string).transpose()?)
}

fn json_value(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<serde_json::Value>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}
