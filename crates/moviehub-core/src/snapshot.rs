// ABOUTME: Immutable snapshot artifact schema, version records, and reconstructed dataset state.
// ABOUTME: Parsing validates the artifact schema version and accepts the legacy `movies` key.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

use crate::model::{DatasetId, MovieId, PublicationType, UserId};

/// Schema version written into every new artifact.
pub const SCHEMA_VERSION: u32 = 1;

/// Globally unique identifier of one version. Generated before the artifact
/// is written so the artifact location is known up front.
pub type VersionId = Ulid;

/// Ordinal of a version within its dataset, starting at 1. Rendered and
/// serialized as a plain decimal string ("1", "2", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionNumber(NonZeroU32);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid version number: {0:?}")]
pub struct ParseVersionNumberError(pub String);

impl VersionNumber {
    pub const FIRST: VersionNumber = VersionNumber(NonZeroU32::MIN);

    /// Build from a raw ordinal. Returns None for zero.
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// The number following this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VersionNumber {
    type Err = ParseVersionNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // No sign, no padding: the canonical form is what Display produces.
        if s.is_empty() || s.starts_with('0') || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseVersionNumberError(s.to_string()));
        }
        s.parse::<u32>()
            .ok()
            .and_then(VersionNumber::new)
            .ok_or_else(|| ParseVersionNumberError(s.to_string()))
    }
}

impl TryFrom<String> for VersionNumber {
    type Error = ParseVersionNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionNumber> for String {
    fn from(value: VersionNumber) -> Self {
        value.to_string()
    }
}

/// One ledger entry: a numbered pointer from a dataset to an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version_id: VersionId,
    pub dataset_id: DatasetId,
    pub version_number: VersionNumber,
    pub created_at: DateTime<Utc>,
    pub artifact_path: String,
}

/// Dataset metadata as captured in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub publication_type: Option<PublicationType>,
    #[serde(default)]
    pub publication_doi: Option<String>,
    #[serde(default)]
    pub dataset_doi: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One movie as captured in a snapshot. `id` is mandatory: records are
/// matched across snapshots by it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: MovieId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub production_company: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub imdb_rating: Option<f64>,
    #[serde(default)]
    pub imdb_votes: Option<i64>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub screenplay: Option<serde_json::Value>,
    #[serde(default)]
    pub cast: Option<serde_json::Value>,
    #[serde(default)]
    pub awards: Option<serde_json::Value>,
}

impl MovieRecord {
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

fn legacy_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// The on-disk document for one version. Written once, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotArtifact {
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
    pub dataset_id: DatasetId,
    #[serde(default)]
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub version_number: Option<VersionNumber>,
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
    pub metadata: SnapshotMetadata,
    #[serde(alias = "movies")]
    pub records: Vec<MovieRecord>,
}

/// Errors raised when an artifact's bytes are not a valid snapshot.
#[derive(Debug, Error)]
pub enum ArtifactFormatError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported snapshot schema version {found} (supported: {SCHEMA_VERSION})")]
    UnsupportedSchema { found: u32 },
}

impl SnapshotArtifact {
    /// Serialize as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, ArtifactFormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate an artifact.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ArtifactFormatError> {
        let artifact: SnapshotArtifact = serde_json::from_slice(bytes)?;
        if artifact.schema_version != SCHEMA_VERSION {
            return Err(ArtifactFormatError::UnsupportedSchema {
                found: artifact.schema_version,
            });
        }
        Ok(artifact)
    }

    /// Detach the dataset state from the envelope.
    pub fn into_state(self) -> ReconstructedState {
        ReconstructedState {
            dataset_id: self.dataset_id,
            metadata: self.metadata,
            records: self.records,
        }
    }
}

/// A dataset rebuilt from an artifact. Plain data with no link back to the
/// catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconstructedState {
    pub dataset_id: DatasetId,
    pub metadata: SnapshotMetadata,
    pub records: Vec<MovieRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_number_is_a_plain_string() {
        let n = VersionNumber::new(12).unwrap();
        assert_eq!(n.to_string(), "12");
        assert_eq!(serde_json::to_value(n).unwrap(), serde_json::json!("12"));
        assert_eq!("12".parse::<VersionNumber>().unwrap(), n);
        assert_eq!(VersionNumber::FIRST.next().to_string(), "2");
    }

    #[test]
    fn version_number_rejects_non_canonical() {
        assert!("0".parse::<VersionNumber>().is_err());
        assert!("01".parse::<VersionNumber>().is_err());
        assert!("1.0".parse::<VersionNumber>().is_err());
        assert!("-1".parse::<VersionNumber>().is_err());
        assert!("".parse::<VersionNumber>().is_err());
        assert!(VersionNumber::new(0).is_none());
    }

    #[test]
    fn artifact_accepts_legacy_layout() {
        // Older artifacts have no envelope fields and call records "movies".
        let legacy = serde_json::json!({
            "dataset_id": 4,
            "metadata": {
                "title": "Sci-Fi Masterpieces Collection",
                "description": "Essential science fiction films",
                "publication_type": "OTHER",
                "publication_doi": null,
                "dataset_doi": "10.1234/scify-2024",
                "tags": ["movies", "sci-fi"]
            },
            "movies": [
                {"id": 1, "title": "Blade Runner", "year": 1982, "cast": ["Harrison Ford"]}
            ]
        });

        let artifact = SnapshotArtifact::from_slice(legacy.to_string().as_bytes()).unwrap();
        assert_eq!(artifact.schema_version, SCHEMA_VERSION);
        assert!(artifact.version_number.is_none());
        assert_eq!(artifact.records.len(), 1);
        assert_eq!(artifact.records[0].year, Some(1982));
        assert_eq!(
            artifact.metadata.publication_type,
            Some(PublicationType::Other)
        );
    }

    #[test]
    fn artifact_rejects_unknown_schema() {
        let doc = serde_json::json!({
            "schema_version": 99,
            "dataset_id": 1,
            "metadata": {},
            "records": []
        });
        let err = SnapshotArtifact::from_slice(doc.to_string().as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ArtifactFormatError::UnsupportedSchema { found: 99 }
        ));
    }

    #[test]
    fn artifact_rejects_record_without_id() {
        let doc = serde_json::json!({
            "dataset_id": 1,
            "metadata": {},
            "records": [{"title": "No identity"}]
        });
        let err = SnapshotArtifact::from_slice(doc.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, ArtifactFormatError::Json(_)));
    }

    #[test]
    fn into_state_keeps_metadata_and_records() {
        let artifact = SnapshotArtifact {
            schema_version: SCHEMA_VERSION,
            dataset_id: 8,
            owner_id: Some(1),
            version_number: Some(VersionNumber::FIRST),
            captured_at: Some(Utc::now()),
            metadata: SnapshotMetadata {
                title: Some("T1".to_string()),
                ..SnapshotMetadata::default()
            },
            records: vec![MovieRecord::new(1, "M1")],
        };

        let state = artifact.into_state();
        assert_eq!(state.dataset_id, 8);
        assert_eq!(state.metadata.title.as_deref(), Some("T1"));
        assert_eq!(state.records, vec![MovieRecord::new(1, "M1")]);
    }
}
