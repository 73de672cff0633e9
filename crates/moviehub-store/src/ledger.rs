// ABOUTME: Append-only version ledger stored in SQLite, one row per dataset version.
// ABOUTME: Assigns version numbers and appends rows inside an immediate transaction per dataset.

use std::sync::Arc;

use chrono::Utc;
use moviehub_core::model::DatasetId;
use moviehub_core::snapshot::{ParseVersionNumberError, VersionId, VersionNumber, VersionRecord};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use thiserror::Error;
use ulid::Ulid;

use crate::db::{Database, DatabaseError, conversion_error, timestamp_column};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("version not found: {0}")]
    NotFound(VersionId),

    #[error("dataset not found: {0}")]
    DatasetNotFound(DatasetId),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Database(err.into())
    }
}

const VERSION_COLUMNS: &str = "version_id, dataset_id, version_number, created_at, artifact_path";

/// The ordered record of versions per dataset. Rows are never updated or
/// deleted here; they disappear only when their dataset is deleted.
pub struct Ledger {
    db: Arc<Database>,
}

impl Ledger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The number the next version of `dataset_id` would receive.
    pub fn next_version_number(&self, dataset_id: DatasetId) -> Result<VersionNumber, LedgerError> {
        let conn = self.db.lock()?;
        next_number(&conn, dataset_id)
    }

    /// All versions of a dataset, oldest first.
    pub fn list_versions(&self, dataset_id: DatasetId) -> Result<Vec<VersionRecord>, LedgerError> {
        self.query_versions(dataset_id, "ASC")
    }

    /// All versions of a dataset, newest first, for display.
    pub fn list_versions_desc(
        &self,
        dataset_id: DatasetId,
    ) -> Result<Vec<VersionRecord>, LedgerError> {
        self.query_versions(dataset_id, "DESC")
    }

    /// The most recent version of a dataset, if any.
    pub fn latest_version(
        &self,
        dataset_id: DatasetId,
    ) -> Result<Option<VersionRecord>, LedgerError> {
        let conn = self.db.lock()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {VERSION_COLUMNS} FROM versions WHERE dataset_id = ?1
                     ORDER BY version_number DESC LIMIT 1"
                ),
                params![dataset_id],
                version_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Look up one version by id.
    pub fn resolve(&self, version_id: &VersionId) -> Result<VersionRecord, LedgerError> {
        let conn = self.db.lock()?;
        conn.query_row(
            &format!("SELECT {VERSION_COLUMNS} FROM versions WHERE version_id = ?1"),
            params![version_id.to_string()],
            version_from_row,
        )
        .optional()?
        .ok_or(LedgerError::NotFound(*version_id))
    }

    /// Append a version for `dataset_id`.
    ///
    /// Takes the database write lock (`BEGIN IMMEDIATE`), assigns the next
    /// number and a fresh version id, then calls `write` with them. `write`
    /// stores the artifact and returns its location. The row is inserted and
    /// committed only after `write` succeeds; on any error the transaction is
    /// rolled back and nothing is recorded. Concurrent appends for the same
    /// dataset are therefore serialized.
    pub fn append_with<F, E>(&self, dataset_id: DatasetId, write: F) -> Result<VersionRecord, E>
    where
        F: FnOnce(VersionId, VersionNumber) -> Result<String, E>,
        E: From<LedgerError>,
    {
        let mut conn = self.db.lock().map_err(LedgerError::from)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(LedgerError::from)?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM datasets WHERE id = ?1",
                params![dataset_id],
                |_| Ok(()),
            )
            .optional()
            .map_err(LedgerError::from)?;
        if exists.is_none() {
            return Err(LedgerError::DatasetNotFound(dataset_id).into());
        }

        let version_number = next_number(&tx, dataset_id)?;
        let version_id = Ulid::new();
        let artifact_path = write(version_id, version_number)?;

        let record = VersionRecord {
            version_id,
            dataset_id,
            version_number,
            created_at: Utc::now(),
            artifact_path,
        };

        tx.execute(
            &format!("INSERT INTO versions ({VERSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                record.version_id.to_string(),
                record.dataset_id,
                record.version_number.get(),
                record.created_at.to_rfc3339(),
                record.artifact_path,
            ],
        )
        .map_err(LedgerError::from)?;
        tx.commit().map_err(LedgerError::from)?;

        Ok(record)
    }

    fn query_versions(
        &self,
        dataset_id: DatasetId,
        order: &str,
    ) -> Result<Vec<VersionRecord>, LedgerError> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {VERSION_COLUMNS} FROM versions WHERE dataset_id = ?1
             ORDER BY version_number {order}"
        ))?;
        let rows = stmt.query_map(params![dataset_id], version_from_row)?;

        let mut versions = Vec::new();
        for row in rows {
            versions.push(row?);
        }
        Ok(versions)
    }
}

/// One past the highest number recorded for the dataset. Equal to
/// `count + 1` since rows are only removed together with their dataset.
fn next_number(conn: &Connection, dataset_id: DatasetId) -> Result<VersionNumber, LedgerError> {
    let highest: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version_number), 0) FROM versions WHERE dataset_id = ?1",
        params![dataset_id],
        |row| row.get(0),
    )?;
    Ok(VersionNumber::new(highest)
        .map(VersionNumber::next)
        .unwrap_or(VersionNumber::FIRST))
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<VersionRecord> {
    let raw_id: String = row.get(0)?;
    let version_id = raw_id
        .parse::<Ulid>()
        .map_err(|e| conversion_error(0, e))?;

    let raw_number: u32 = row.get(2)?;
    let version_number = VersionNumber::new(raw_number)
        .ok_or_else(|| conversion_error(2, ParseVersionNumberError(raw_number.to_string())))?;

    Ok(VersionRecord {
        version_id,
        dataset_id: row.get(1)?,
        version_number,
        created_at: timestamp_column(row, 3)?,
        artifact_path: row.get(4)?,
    })
}
