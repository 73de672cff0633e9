// ABOUTME: Version service: snapshots live datasets, reloads past states, and diffs versions.
// ABOUTME: Combines the ledger with an artifact store; artifacts are written before rows commit.

use std::sync::Arc;

use chrono::Utc;
use moviehub_core::diff::{DiffError, DiffReport, compare};
use moviehub_core::model::{DatasetId, LiveDataset};
use moviehub_core::snapshot::{
    ArtifactFormatError, ReconstructedState, SCHEMA_VERSION, SnapshotArtifact, VersionId,
    VersionRecord,
};
use thiserror::Error;

use crate::artifact::{ArtifactError, ArtifactKey, ArtifactStore};
use crate::db::DatabaseError;
use crate::ledger::{Ledger, LedgerError};

/// Errors surfaced by version operations.
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("version not found: {0}")]
    NotFound(VersionId),

    #[error("version {0} has no artifact")]
    MissingArtifact(VersionId),

    #[error("dataset not found: {0}")]
    DatasetNotFound(DatasetId),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact format error: {0}")]
    Format(#[from] ArtifactFormatError),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    #[error("artifact already exists at {0}")]
    ArtifactExists(String),
}

impl VersionError {
    /// True when the version cannot be shown: it does not exist, has no
    /// artifact, or its artifact cannot be parsed.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            VersionError::NotFound(_) | VersionError::MissingArtifact(_) | VersionError::Format(_)
        )
    }
}

impl From<ArtifactError> for VersionError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Io(e) => VersionError::Io(e),
            ArtifactError::Format(e) => VersionError::Format(e),
            ArtifactError::AlreadyExists(path) => VersionError::ArtifactExists(path),
        }
    }
}

impl From<LedgerError> for VersionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(id) => VersionError::NotFound(id),
            LedgerError::DatasetNotFound(id) => VersionError::DatasetNotFound(id),
            LedgerError::Database(e) => VersionError::Database(e),
        }
    }
}

/// Creates, loads, and compares dataset versions.
pub struct VersionService {
    ledger: Ledger,
    artifacts: Arc<dyn ArtifactStore>,
}

impl VersionService {
    pub fn new(ledger: Ledger, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { ledger, artifacts }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Snapshot the dataset's current state as the next version.
    ///
    /// The live state is captured before the ledger is locked. The artifact
    /// is written and made durable before the ledger row is committed; if the
    /// write fails, no version is recorded.
    pub fn create_version(&self, dataset: &dyn LiveDataset) -> Result<VersionRecord, VersionError> {
        let dataset_id = dataset.dataset_id();
        let owner_id = dataset.owner_id();
        let metadata = dataset.snapshot_metadata();
        let records = dataset.snapshot_records();

        let record = self
            .ledger
            .append_with(dataset_id, |version_id, version_number| {
                let artifact = SnapshotArtifact {
                    schema_version: SCHEMA_VERSION,
                    dataset_id,
                    owner_id: Some(owner_id),
                    version_number: Some(version_number),
                    captured_at: Some(Utc::now()),
                    metadata,
                    records,
                };
                let key = ArtifactKey {
                    owner_id,
                    dataset_id,
                    version_id,
                };
                self.artifacts
                    .write(&key, &artifact)
                    .map_err(VersionError::from)
            })?;

        tracing::info!(
            "created version {} ({}) of dataset {}",
            record.version_number,
            record.version_id,
            dataset_id
        );
        Ok(record)
    }

    /// Rebuild the dataset state captured by a version.
    pub fn load_dataset_from_version(
        &self,
        version_id: &VersionId,
    ) -> Result<ReconstructedState, VersionError> {
        let record = self.ledger.resolve(version_id)?;
        if record.artifact_path.is_empty() {
            return Err(VersionError::MissingArtifact(*version_id));
        }

        let artifact = self.artifacts.read(&record.artifact_path).inspect_err(|e| {
            tracing::warn!("version {} could not be loaded: {}", version_id, e);
        })?;

        tracing::info!(
            "loaded version {} of dataset {} ({} movies)",
            record.version_number,
            record.dataset_id,
            artifact.records.len()
        );
        Ok(artifact.into_state())
    }

    /// Diff two already loaded states, `older` first.
    pub fn compare_versions(
        &self,
        older: &ReconstructedState,
        newer: &ReconstructedState,
    ) -> Result<DiffReport, VersionError> {
        Ok(compare(older, newer)?)
    }

    /// Load both versions and diff them. Versions of different datasets are
    /// compared as-is.
    pub fn compare_version_ids(
        &self,
        older: &VersionId,
        newer: &VersionId,
    ) -> Result<DiffReport, VersionError> {
        let a = self.load_dataset_from_version(older)?;
        let b = self.load_dataset_from_version(newer)?;
        self.compare_versions(&a, &b)
    }

    /// All versions of a dataset, oldest first.
    pub fn list_versions(&self, dataset_id: DatasetId) -> Result<Vec<VersionRecord>, VersionError> {
        Ok(self.ledger.list_versions(dataset_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use moviehub_core::model::{DatasetMetadata, MovieDataset, NewMovie, UserId};
    use moviehub_core::snapshot::{MovieRecord, VersionNumber};
    use tempfile::TempDir;

    use crate::artifact::{FsArtifactStore, UploadsLayout};
    use crate::catalog::Catalog;
    use crate::db::Database;

    struct Fixture {
        _dir: TempDir,
        db: Arc<Database>,
        catalog: Catalog,
        service: VersionService,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(Database::open_in_memory().unwrap());
        let store = FsArtifactStore::new(UploadsLayout::new(dir.path().join("uploads")));
        let service = VersionService::new(Ledger::new(Arc::clone(&db)), Arc::new(store));
        Fixture {
            _dir: dir,
            catalog: Catalog::new(Arc::clone(&db)),
            db,
            service,
        }
    }

    fn live(catalog: &Catalog, id: DatasetId) -> MovieDataset {
        catalog.get_dataset(id).unwrap()
    }

    /// Store that fails every write.
    struct FailingStore;

    impl ArtifactStore for FailingStore {
        fn write(&self, _: &ArtifactKey, _: &SnapshotArtifact) -> Result<String, ArtifactError> {
            Err(std::io::Error::other("disk full").into())
        }

        fn read(&self, _: &str) -> Result<SnapshotArtifact, ArtifactError> {
            Err(std::io::Error::other("unreachable").into())
        }

        fn remove_dataset(&self, _: UserId, _: DatasetId) -> Result<(), ArtifactError> {
            Ok(())
        }
    }

    #[test]
    fn versions_are_numbered_in_order() {
        let f = fixture();
        let id = f
            .catalog
            .create_dataset(1, &DatasetMetadata::new("T1", "D"))
            .unwrap();

        let v1 = f.service.create_version(&live(&f.catalog, id)).unwrap();
        let v2 = f.service.create_version(&live(&f.catalog, id)).unwrap();
        let v3 = f.service.create_version(&live(&f.catalog, id)).unwrap();

        assert_eq!(v1.version_number.to_string(), "1");
        assert_eq!(v2.version_number.to_string(), "2");
        assert_eq!(v3.version_number.to_string(), "3");
        assert!(v1.created_at <= v2.created_at && v2.created_at <= v3.created_at);
        assert_eq!(f.service.list_versions(id).unwrap(), vec![v1, v2, v3]);
    }

    #[test]
    fn artifact_lands_under_owner_and_dataset() {
        let f = fixture();
        let id = f
            .catalog
            .create_dataset(7, &DatasetMetadata::new("T1", "D"))
            .unwrap();

        let v = f.service.create_version(&live(&f.catalog, id)).unwrap();
        let expected_suffix = format!(
            "user_7/dataset_{}/versions/{}/snapshot.json",
            id, v.version_id
        );
        assert!(v.artifact_path.ends_with(&expected_suffix));

        let text = fs::read_to_string(&v.artifact_path).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["schema_version"], 1);
        assert_eq!(doc["version_number"], "1");
        assert_eq!(doc["owner_id"], 7);
    }

    #[test]
    fn load_round_trips_current_state() {
        let f = fixture();
        let mut meta = DatasetMetadata::new("Noir", "Classic noir");
        meta.tags = Some("noir, 1940s,".to_string());
        let id = f.catalog.create_dataset(1, &meta).unwrap();

        let mut movie = NewMovie::new("The Maltese Falcon", 1941);
        movie.director = Some("John Huston".to_string());
        movie.cast = Some(serde_json::json!(["Humphrey Bogart", "Mary Astor"]));
        f.catalog.add_movie(id, &movie).unwrap();

        let dataset = live(&f.catalog, id);
        let v = f.service.create_version(&dataset).unwrap();
        let state = f.service.load_dataset_from_version(&v.version_id).unwrap();

        assert_eq!(state.dataset_id, id);
        assert_eq!(state.metadata, dataset.snapshot_metadata());
        assert_eq!(state.metadata.tags, vec!["noir", "1940s"]);
        assert_eq!(state.records, dataset.snapshot_records());
    }

    #[test]
    fn reloaded_floats_are_bit_identical() {
        let f = fixture();
        let id = f
            .catalog
            .create_dataset(1, &DatasetMetadata::new("Ratings", "D"))
            .unwrap();

        let ratings = [
            1.7546217903306627,
            7.2316896362404055,
            9.720916325967499,
            9.612558037550293,
        ];
        for (i, rating) in ratings.iter().enumerate() {
            let mut movie = NewMovie::new(format!("M{}", i), 2000 + i as i32);
            movie.imdb_rating = Some(*rating);
            movie.awards = Some(serde_json::json!({"score": rating}));
            f.catalog.add_movie(id, &movie).unwrap();
        }

        let dataset = live(&f.catalog, id);
        let v = f.service.create_version(&dataset).unwrap();
        let state = f.service.load_dataset_from_version(&v.version_id).unwrap();

        assert_eq!(state.records, dataset.snapshot_records());
        for (record, rating) in state.records.iter().zip(ratings) {
            assert_eq!(record.imdb_rating.map(f64::to_bits), Some(rating.to_bits()));
            assert_eq!(
                record.awards.as_ref().and_then(|a| a["score"].as_f64()).map(f64::to_bits),
                Some(rating.to_bits())
            );
        }
    }

    #[test]
    fn title_change_and_added_movie_between_versions() {
        let f = fixture();
        let id = f
            .catalog
            .create_dataset(1, &DatasetMetadata::new("T1", "D"))
            .unwrap();
        let m1 = f.catalog.add_movie(id, &NewMovie::new("M1", 2001)).unwrap();
        let v1 = f.service.create_version(&live(&f.catalog, id)).unwrap();

        f.catalog
            .update_metadata(id, &DatasetMetadata::new("T2", "D"))
            .unwrap();
        let m2 = f.catalog.add_movie(id, &NewMovie::new("M2", 2002)).unwrap();
        let v2 = f.service.create_version(&live(&f.catalog, id)).unwrap();

        let report = f
            .service
            .compare_version_ids(&v1.version_id, &v2.version_id)
            .unwrap();
        assert_eq!(report.metadata_changed.len(), 1);
        assert_eq!(report.metadata_changed["title"].old, "T1");
        assert_eq!(report.metadata_changed["title"].new, "T2");
        assert_eq!(report.records_added.len(), 1);
        assert_eq!(report.records_added[0].id, m2);
        assert!(report.records_removed.is_empty());
        assert!(report.records_modified.is_empty());
        assert_ne!(m1, m2);
    }

    #[test]
    fn removed_movie_shows_as_removed() {
        let f = fixture();
        let id = f
            .catalog
            .create_dataset(1, &DatasetMetadata::new("T", "D"))
            .unwrap();
        f.catalog.add_movie(id, &NewMovie::new("M1", 2001)).unwrap();
        let m2 = f.catalog.add_movie(id, &NewMovie::new("M2", 2002)).unwrap();
        let v1 = f.service.create_version(&live(&f.catalog, id)).unwrap();

        f.catalog.remove_movie(id, m2).unwrap();
        let v2 = f.service.create_version(&live(&f.catalog, id)).unwrap();

        let report = f
            .service
            .compare_version_ids(&v1.version_id, &v2.version_id)
            .unwrap();
        assert_eq!(report.records_removed.len(), 1);
        assert_eq!(report.records_removed[0].id, m2);
        assert!(report.records_modified.is_empty());
        assert!(report.records_added.is_empty());
    }

    #[test]
    fn unchanged_dataset_diffs_empty() {
        let f = fixture();
        let id = f
            .catalog
            .create_dataset(1, &DatasetMetadata::new("T", "D"))
            .unwrap();
        f.catalog.add_movie(id, &NewMovie::new("M1", 2001)).unwrap();

        let v1 = f.service.create_version(&live(&f.catalog, id)).unwrap();
        let v2 = f.service.create_version(&live(&f.catalog, id)).unwrap();
        let report = f
            .service
            .compare_version_ids(&v1.version_id, &v2.version_id)
            .unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn failed_write_records_no_version() {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(Database::open(&dir.path().join("moviehub.db")).unwrap());
        let catalog = Catalog::new(Arc::clone(&db));
        let service = VersionService::new(Ledger::new(Arc::clone(&db)), Arc::new(FailingStore));

        let id = catalog
            .create_dataset(1, &DatasetMetadata::new("T", "D"))
            .unwrap();
        let err = service.create_version(&live(&catalog, id)).unwrap_err();
        assert!(matches!(err, VersionError::Io(_)));
        assert!(service.list_versions(id).unwrap().is_empty());
        assert_eq!(
            service.ledger().next_version_number(id).unwrap(),
            VersionNumber::FIRST
        );
    }

    #[test]
    fn corrupt_artifact_is_unavailable() {
        let f = fixture();
        let id = f
            .catalog
            .create_dataset(1, &DatasetMetadata::new("T", "D"))
            .unwrap();
        let v = f.service.create_version(&live(&f.catalog, id)).unwrap();

        fs::write(&v.artifact_path, b"not json").unwrap();
        let err = f.service.load_dataset_from_version(&v.version_id).unwrap_err();
        assert!(matches!(err, VersionError::Format(_)));
        assert!(err.is_unavailable());
    }

    #[test]
    fn deleted_artifact_is_io_error() {
        let f = fixture();
        let id = f
            .catalog
            .create_dataset(1, &DatasetMetadata::new("T", "D"))
            .unwrap();
        let v = f.service.create_version(&live(&f.catalog, id)).unwrap();

        fs::remove_file(&v.artifact_path).unwrap();
        let err = f.service.load_dataset_from_version(&v.version_id).unwrap_err();
        assert!(matches!(err, VersionError::Io(_)));
        assert!(!err.is_unavailable());
    }

    #[test]
    fn empty_artifact_path_is_missing() {
        let f = fixture();
        let id = f
            .catalog
            .create_dataset(1, &DatasetMetadata::new("T", "D"))
            .unwrap();
        let v = f.service.create_version(&live(&f.catalog, id)).unwrap();

        f.db.lock()
            .unwrap()
            .execute(
                "UPDATE versions SET artifact_path = '' WHERE version_id = ?1",
                [v.version_id.to_string()],
            )
            .unwrap();

        let err = f.service.load_dataset_from_version(&v.version_id).unwrap_err();
        assert!(matches!(err, VersionError::MissingArtifact(_)));
        assert!(err.is_unavailable());
    }

    #[test]
    fn unknown_version_is_not_found() {
        let f = fixture();
        let missing = ulid::Ulid::new();
        let err = f.service.load_dataset_from_version(&missing).unwrap_err();
        assert!(matches!(err, VersionError::NotFound(id) if id == missing));
        assert!(err.is_unavailable());

        let err = f.service.compare_version_ids(&missing, &missing).unwrap_err();
        assert!(matches!(err, VersionError::NotFound(_)));
    }

    #[test]
    fn snapshot_of_unknown_dataset_fails() {
        let f = fixture();
        let ghost = MovieDataset {
            id: 99,
            owner_id: 1,
            created_at: Utc::now(),
            metadata: DatasetMetadata::new("Ghost", "D"),
            movies: Vec::new(),
        };

        let err = f.service.create_version(&ghost).unwrap_err();
        assert!(matches!(err, VersionError::DatasetNotFound(99)));
    }

    #[test]
    fn duplicate_ids_in_loaded_state_surface_as_diff_error() {
        let f = fixture();
        let older = ReconstructedState {
            dataset_id: 1,
            records: vec![MovieRecord::new(1, "A"), MovieRecord::new(1, "B")],
            ..ReconstructedState::default()
        };
        let err = f
            .service
            .compare_versions(&older, &ReconstructedState::default())
            .unwrap_err();
        assert!(matches!(err, VersionError::Diff(_)));
    }
}
