// ABOUTME: Shared SQLite database handle with schema migrations for catalog and ledger tables.
// ABOUTME: Wraps a single rusqlite Connection in a mutex so callers are serialized in-process.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rusqlite::types::Type;
use thiserror::Error;

/// Errors that can occur while talking to the database.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database connection mutex poisoned")]
    Poisoned,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS datasets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    publication_type TEXT,
    publication_doi TEXT,
    dataset_doi TEXT,
    tags TEXT
);

CREATE INDEX IF NOT EXISTS datasets_by_owner ON datasets(owner_id);

CREATE TABLE IF NOT EXISTS movies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset_id INTEGER NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    original_title TEXT,
    year INTEGER NOT NULL,
    duration INTEGER,
    country TEXT,
    director TEXT,
    production_company TEXT,
    genre TEXT,
    synopsis TEXT,
    imdb_rating REAL,
    imdb_votes INTEGER,
    poster_url TEXT,
    poster_local_path TEXT,
    screenplay_json TEXT,
    cast_json TEXT,
    awards_json TEXT
);

CREATE INDEX IF NOT EXISTS movies_by_dataset ON movies(dataset_id);

CREATE TABLE IF NOT EXISTS versions (
    version_id TEXT PRIMARY KEY,
    dataset_id INTEGER NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
    version_number INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    artifact_path TEXT NOT NULL,
    UNIQUE (dataset_id, version_number)
);
";

/// The moviehub database. One connection, shared behind a mutex; catalog
/// and ledger both borrow it through an `Arc<Database>`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database file at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// Open a private in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection for the duration of the returned guard.
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }
}

/// Wrap a parse failure on column `idx` as a rusqlite conversion error.
pub(crate) fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Read an RFC 3339 timestamp column.
pub(crate) fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_creates_schema() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("moviehub.db")).unwrap();

        let conn = db.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert!(tables.contains(&"datasets".to_string()));
        assert!(tables.contains(&"movies".to_string()));
        assert!(tables.contains(&"versions".to_string()));
    }

    #[test]
    fn reopen_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("moviehub.db");

        drop(Database::open(&path).unwrap());
        let db = Database::open(&path).unwrap();
        assert!(db.lock().is_ok());
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();

        let result = conn.execute(
            "INSERT INTO movies (dataset_id, title, year) VALUES (42, 'Orphan', 2000)",
            [],
        );
        assert!(result.is_err());
    }
}
