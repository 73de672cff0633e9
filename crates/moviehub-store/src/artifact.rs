// ABOUTME: Snapshot artifact storage: the path layout strategy and the filesystem backend.
// ABOUTME: Artifacts are written once with atomic rename and never modified afterwards.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use moviehub_core::model::{DatasetId, UserId};
use moviehub_core::snapshot::{ArtifactFormatError, SnapshotArtifact, VersionId};
use thiserror::Error;

/// Errors that can occur while writing or reading artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact format error: {0}")]
    Format(#[from] ArtifactFormatError),

    #[error("artifact already exists at {0}")]
    AlreadyExists(String),
}

/// Identity of one artifact: which owner, dataset, and version it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactKey {
    pub owner_id: UserId,
    pub dataset_id: DatasetId,
    pub version_id: VersionId,
}

/// Maps artifact identity to a storage location. Swappable so a different
/// backend can use its own key scheme.
pub trait ArtifactLayout: Send + Sync {
    /// Location of the artifact for one version.
    fn artifact_path(&self, key: &ArtifactKey) -> PathBuf;

    /// Directory holding everything stored for one dataset.
    fn dataset_dir(&self, owner_id: UserId, dataset_id: DatasetId) -> PathBuf;
}

/// The uploads directory layout:
/// `<root>/user_<owner>/dataset_<dataset>/versions/<version>/snapshot.json`.
#[derive(Debug, Clone)]
pub struct UploadsLayout {
    root: PathBuf,
}

impl UploadsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactLayout for UploadsLayout {
    fn artifact_path(&self, key: &ArtifactKey) -> PathBuf {
        self.dataset_dir(key.owner_id, key.dataset_id)
            .join("versions")
            .join(key.version_id.to_string())
            .join("snapshot.json")
    }

    fn dataset_dir(&self, owner_id: UserId, dataset_id: DatasetId) -> PathBuf {
        self.root
            .join(format!("user_{}", owner_id))
            .join(format!("dataset_{}", dataset_id))
    }
}

/// Durable storage for snapshot artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Write a new artifact and return the location to record in the ledger.
    /// Must not return until the artifact is durable.
    fn write(&self, key: &ArtifactKey, artifact: &SnapshotArtifact) -> Result<String, ArtifactError>;

    /// Read and validate the artifact at a location previously returned by `write`.
    fn read(&self, location: &str) -> Result<SnapshotArtifact, ArtifactError>;

    /// Remove every artifact stored for a dataset. Missing data is not an error.
    fn remove_dataset(&self, owner_id: UserId, dataset_id: DatasetId) -> Result<(), ArtifactError>;
}

/// Filesystem-backed artifact store.
#[derive(Debug, Clone)]
pub struct FsArtifactStore<L = UploadsLayout> {
    layout: L,
}

impl<L: ArtifactLayout> FsArtifactStore<L> {
    pub fn new(layout: L) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }
}

impl<L: ArtifactLayout> ArtifactStore for FsArtifactStore<L> {
    /// Write to a `.tmp` sibling, fsync, rename into place, then fsync the
    /// directory.
    fn write(&self, key: &ArtifactKey, artifact: &SnapshotArtifact) -> Result<String, ArtifactError> {
        let final_path = self.layout.artifact_path(key);
        if final_path.exists() {
            return Err(ArtifactError::AlreadyExists(final_path.display().to_string()));
        }

        let dir = final_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir)?;

        let json = artifact.to_json_pretty()?;
        let mut tmp_name = final_path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = dir.join(tmp_name);

        if let Err(e) = write_durable(&tmp_path, json.as_bytes())
            .and_then(|()| fs::rename(&tmp_path, &final_path))
        {
            let _ = fs::remove_file(&tmp_path);
            let _ = fs::remove_dir(&dir);
            return Err(e.into());
        }

        // Best-effort: the rename already happened, so a failed directory
        // fsync leaves a consistent artifact behind.
        if let Ok(dir_handle) = File::open(&dir) {
            let _ = dir_handle.sync_all();
        }

        tracing::debug!("wrote snapshot artifact {}", final_path.display());
        Ok(final_path.to_string_lossy().into_owned())
    }

    fn read(&self, location: &str) -> Result<SnapshotArtifact, ArtifactError> {
        let bytes = fs::read(location)?;
        Ok(SnapshotArtifact::from_slice(&bytes)?)
    }

    fn remove_dataset(&self, owner_id: UserId, dataset_id: DatasetId) -> Result<(), ArtifactError> {
        let dir = self.layout.dataset_dir(owner_id, dataset_id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::info!("removed artifacts under {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_durable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
