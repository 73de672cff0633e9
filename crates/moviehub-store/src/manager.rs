// ABOUTME: High-level storage manager for the moviehub home directory layout.
// ABOUTME: Opens the database, wires catalog, ledger, and artifact store, and writes exports.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use moviehub_core::export::export_state_yaml;
use moviehub_core::model::DatasetId;
use moviehub_core::snapshot::{VersionId, VersionRecord};
use thiserror::Error;

use crate::artifact::{ArtifactError, ArtifactStore, FsArtifactStore, UploadsLayout};
use crate::catalog::{Catalog, CatalogError};
use crate::db::{Database, DatabaseError};
use crate::ledger::Ledger;
use crate::versioning::{VersionError, VersionService};

/// Errors that can occur during storage management operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("version error: {0}")]
    Version(#[from] VersionError),

    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("yaml export error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Owns the moviehub home layout:
///
/// ```text
/// <home>/moviehub.db
/// <home>/uploads/user_<owner>/dataset_<id>/versions/<version>/snapshot.json
/// <home>/exports/dataset_<id>/version_<n>.yaml
/// ```
///
/// The database file and uploads root can be placed elsewhere with
/// [`StorageManager::open_with`].
pub struct StorageManager {
    home: PathBuf,
    catalog: Catalog,
    versions: VersionService,
    artifacts: Arc<dyn ArtifactStore>,
}

impl StorageManager {
    /// Open the store rooted at `home`, creating directories and the database
    /// if they do not exist.
    pub fn open(home: PathBuf) -> Result<Self, ManagerError> {
        let db_path = home.join("moviehub.db");
        let uploads = home.join("uploads");
        Self::open_with(home, &db_path, uploads)
    }

    /// Open with an explicit database file and uploads root.
    pub fn open_with(
        home: PathBuf,
        db_path: &Path,
        uploads_root: PathBuf,
    ) -> Result<Self, ManagerError> {
        fs::create_dir_all(&home)?;
        fs::create_dir_all(&uploads_root)?;
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let db = Arc::new(Database::open(db_path)?);
        let artifacts: Arc<dyn ArtifactStore> =
            Arc::new(FsArtifactStore::new(UploadsLayout::new(uploads_root)));

        tracing::debug!("opened moviehub store at {}", db_path.display());
        Ok(Self {
            home,
            catalog: Catalog::new(Arc::clone(&db)),
            versions: VersionService::new(Ledger::new(db), Arc::clone(&artifacts)),
            artifacts,
        })
    }

    /// Return the home directory path.
    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn versions(&self) -> &VersionService {
        &self.versions
    }

    /// Load the dataset from the catalog and snapshot it as a new version.
    pub fn create_version_for(&self, dataset_id: DatasetId) -> Result<VersionRecord, ManagerError> {
        let dataset = self.catalog.get_dataset(dataset_id)?;
        Ok(self.versions.create_version(&dataset)?)
    }

    /// Delete a dataset, its movies, its ledger rows, and every artifact
    /// stored for it. Artifacts are removed after the rows are gone, so a
    /// failure here leaves orphaned files but never a dangling version.
    pub fn delete_dataset(&self, dataset_id: DatasetId) -> Result<(), ManagerError> {
        let owner_id = self.catalog.get_dataset(dataset_id)?.owner_id;
        self.catalog.delete_dataset(dataset_id)?;
        self.artifacts.remove_dataset(owner_id, dataset_id)?;
        Ok(())
    }

    /// Directory holding exports for one dataset (does not create it).
    pub fn export_dir(&self, dataset_id: DatasetId) -> PathBuf {
        self.home
            .join("exports")
            .join(format!("dataset_{}", dataset_id))
    }

    /// Write the YAML rendering of a version under the exports directory and
    /// return its path.
    pub fn write_version_export(&self, version_id: &VersionId) -> Result<PathBuf, ManagerError> {
        let record = self.versions.ledger().resolve(version_id).map_err(VersionError::from)?;
        let state = self.versions.load_dataset_from_version(version_id)?;

        let dir = self.export_dir(record.dataset_id);
        fs::create_dir_all(&dir)?;

        let path = dir.join(format!("version_{}.yaml", record.version_number));
        fs::write(&path, export_state_yaml(&state)?)?;
        tracing::info!("wrote export {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moviehub_core::model::{DatasetMetadata, NewMovie};
    use tempfile::TempDir;

    #[test]
    fn storage_manager_creates_layout() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("moviehub_home");

        let mgr = StorageManager::open(home.clone()).unwrap();

        assert!(home.join("uploads").exists());
        assert!(home.join("moviehub.db").exists());
        assert_eq!(mgr.home(), &home);
    }

    #[test]
    fn open_with_separate_paths() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let db_path = dir.path().join("db").join("store.db");
        let uploads = dir.path().join("media");

        let mgr = StorageManager::open_with(home, &db_path, uploads.clone()).unwrap();
        let id = mgr
            .catalog()
            .create_dataset(4, &DatasetMetadata::new("T", "D"))
            .unwrap();
        let v = mgr.create_version_for(id).unwrap();

        assert!(db_path.exists());
        assert!(Path::new(&v.artifact_path).starts_with(&uploads));
    }

    #[test]
    fn reopen_keeps_versions() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");

        let (id, v1) = {
            let mgr = StorageManager::open(home.clone()).unwrap();
            let id = mgr
                .catalog()
                .create_dataset(1, &DatasetMetadata::new("T", "D"))
                .unwrap();
            (id, mgr.create_version_for(id).unwrap())
        };

        let mgr = StorageManager::open(home).unwrap();
        let v2 = mgr.create_version_for(id).unwrap();
        assert_eq!(v2.version_number, v1.version_number.next());
        assert!(mgr.versions().load_dataset_from_version(&v1.version_id).is_ok());
    }

    #[test]
    fn delete_dataset_removes_rows_and_artifacts() {
        let dir = TempDir::new().unwrap();
        let mgr = StorageManager::open(dir.path().join("home")).unwrap();

        let id = mgr
            .catalog()
            .create_dataset(2, &DatasetMetadata::new("T", "D"))
            .unwrap();
        mgr.catalog().add_movie(id, &NewMovie::new("M1", 1999)).unwrap();
        let v = mgr.create_version_for(id).unwrap();
        assert!(Path::new(&v.artifact_path).exists());

        mgr.delete_dataset(id).unwrap();

        assert!(!Path::new(&v.artifact_path).exists());
        assert!(!dir.path().join("home/uploads/user_2").join(format!("dataset_{}", id)).exists());
        assert!(mgr.versions().list_versions(id).unwrap().is_empty());
        assert!(matches!(
            mgr.delete_dataset(id).unwrap_err(),
            ManagerError::Catalog(CatalogError::DatasetNotFound(_))
        ));
    }

    #[test]
    fn writes_version_export() {
        let dir = TempDir::new().unwrap();
        let mgr = StorageManager::open(dir.path().join("home")).unwrap();

        let id = mgr
            .catalog()
            .create_dataset(1, &DatasetMetadata::new("Export Set", "D"))
            .unwrap();
        mgr.catalog().add_movie(id, &NewMovie::new("Metropolis", 1927)).unwrap();
        let v = mgr.create_version_for(id).unwrap();

        let path = mgr.write_version_export(&v.version_id).unwrap();
        assert_eq!(path, mgr.export_dir(id).join("version_1.yaml"));

        let yaml = fs::read_to_string(path).unwrap();
        assert!(yaml.contains("Export Set"));
        assert!(yaml.contains("Metropolis"));
    }
}
