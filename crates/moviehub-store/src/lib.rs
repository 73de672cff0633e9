// ABOUTME: Persistence layer for moviehub, handling live datasets and their immutable versions.
// ABOUTME: Provides the SQLite catalog and ledger, snapshot artifact storage, and the version service.

pub mod artifact;
pub mod catalog;
pub mod db;
pub mod ledger;
pub mod manager;
pub mod versioning;

pub use artifact::{
    ArtifactError, ArtifactKey, ArtifactLayout, ArtifactStore, FsArtifactStore, UploadsLayout,
};
pub use catalog::{Catalog, CatalogError, DatasetSummary};
pub use db::{Database, DatabaseError};
pub use ledger::{Ledger, LedgerError};
pub use manager::{ManagerError, StorageManager};
pub use versioning::{VersionError, VersionService};
