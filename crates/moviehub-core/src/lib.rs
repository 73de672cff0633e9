// ABOUTME: Core library for moviehub: dataset model, snapshot artifacts, and the structural differ.
// ABOUTME: Pure data and algorithms; all persistence lives in moviehub-store.

pub mod diff;
pub mod export;
pub mod model;
pub mod snapshot;

pub use diff::{DiffError, DiffReport, FieldChange, FieldChanges, RecordChange, Side, compare};
pub use model::{
    DatasetId, DatasetMetadata, LiveDataset, Movie, MovieDataset, MovieId, NewMovie,
    PublicationType, UserId,
};
pub use snapshot::{
    ArtifactFormatError, MovieRecord, ReconstructedState, SCHEMA_VERSION, SnapshotArtifact,
    SnapshotMetadata, VersionId, VersionNumber, VersionRecord,
};
