// ABOUTME: Live domain model for movie datasets: metadata, publication types, and movies.
// ABOUTME: Defines the LiveDataset trait the snapshot writer reads current state through.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::snapshot::{MovieRecord, SnapshotMetadata};

pub type UserId = i64;
pub type DatasetId = i64;
pub type MovieId = i64;

/// Kind of publication a dataset is deposited as. Serializes as its name
/// (`JOURNAL_ARTICLE`); the short value (`article`) is what the catalog stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationType {
    None,
    AnnotationCollection,
    Book,
    BookSection,
    ConferencePaper,
    DataManagementPlan,
    JournalArticle,
    Patent,
    Preprint,
    ProjectDeliverable,
    ProjectMilestone,
    Proposal,
    Report,
    SoftwareDocumentation,
    TaxonomicTreatment,
    TechnicalNote,
    Thesis,
    WorkingPaper,
    Other,
}

const PUBLICATION_TYPES: [(PublicationType, &str, &str); 19] = [
    (PublicationType::None, "none", "NONE"),
    (PublicationType::AnnotationCollection, "annotationcollection", "ANNOTATION_COLLECTION"),
    (PublicationType::Book, "book", "BOOK"),
    (PublicationType::BookSection, "section", "BOOK_SECTION"),
    (PublicationType::ConferencePaper, "conferencepaper", "CONFERENCE_PAPER"),
    (PublicationType::DataManagementPlan, "datamanagementplan", "DATA_MANAGEMENT_PLAN"),
    (PublicationType::JournalArticle, "article", "JOURNAL_ARTICLE"),
    (PublicationType::Patent, "patent", "PATENT"),
    (PublicationType::Preprint, "preprint", "PREPRINT"),
    (PublicationType::ProjectDeliverable, "deliverable", "PROJECT_DELIVERABLE"),
    (PublicationType::ProjectMilestone, "milestone", "PROJECT_MILESTONE"),
    (PublicationType::Proposal, "proposal", "PROPOSAL"),
    (PublicationType::Report, "report", "REPORT"),
    (PublicationType::SoftwareDocumentation, "softwaredocumentation", "SOFTWARE_DOCUMENTATION"),
    (PublicationType::TaxonomicTreatment, "taxonomictreatment", "TAXONOMIC_TREATMENT"),
    (PublicationType::TechnicalNote, "technicalnote", "TECHNICAL_NOTE"),
    (PublicationType::Thesis, "thesis", "THESIS"),
    (PublicationType::WorkingPaper, "workingpaper", "WORKING_PAPER"),
    (PublicationType::Other, "other", "OTHER"),
];

#[derive(Debug, Error)]
#[error("unknown publication type: {0}")]
pub struct ParsePublicationTypeError(pub String);

impl PublicationType {
    fn entry(self) -> (PublicationType, &'static str, &'static str) {
        // Table rows follow declaration order.
        PUBLICATION_TYPES[self as usize]
    }

    /// Short storage value, e.g. `article` for `JournalArticle`.
    pub fn value(self) -> &'static str {
        self.entry().1
    }

    /// Upper snake case name, e.g. `JOURNAL_ARTICLE`.
    pub fn name(self) -> &'static str {
        self.entry().2
    }

    /// Human-readable label, e.g. `Journal Article`.
    pub fn display_name(self) -> String {
        self.name()
            .split('_')
            .map(|word| {
                let lower = word.to_lowercase();
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromStr for PublicationType {
    type Err = ParsePublicationTypeError;

    /// Accepts either the storage value or the name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        PUBLICATION_TYPES
            .into_iter()
            .find(|(_, value, name)| {
                value.eq_ignore_ascii_case(needle) || name.eq_ignore_ascii_case(needle)
            })
            .map(|(kind, _, _)| kind)
            .ok_or_else(|| ParsePublicationTypeError(s.to_string()))
    }
}

impl fmt::Display for PublicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptive metadata of a dataset as the catalog stores it. Tags are a
/// single comma-separated string here; snapshots carry them as a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub title: String,
    pub description: String,
    pub publication_type: Option<PublicationType>,
    pub publication_doi: Option<String>,
    pub dataset_doi: Option<String>,
    pub tags: Option<String>,
}

impl DatasetMetadata {
    /// Create metadata with a title and description. Publication type defaults
    /// to `None` (the enum variant), the rest is empty.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            publication_type: Some(PublicationType::None),
            publication_doi: None,
            dataset_doi: None,
            tags: None,
        }
    }

    /// Split the comma-separated tag string into trimmed, non-empty tags.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Build the snapshot form of this metadata, copying every field verbatim
    /// except tags, which become a list.
    pub fn to_snapshot(&self) -> SnapshotMetadata {
        SnapshotMetadata {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            publication_type: self.publication_type,
            publication_doi: self.publication_doi.clone(),
            dataset_doi: self.dataset_doi.clone(),
            tags: self.tag_list(),
        }
    }
}

/// A movie's editable fields, without identity. Used for inserts and for
/// JSON imports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    pub year: i32,
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
    pub poster_local_path: Option<String>,
    #[serde(default)]
    pub screenplay: Option<serde_json::Value>,
    #[serde(default)]
    pub cast: Option<serde_json::Value>,
    #[serde(default)]
    pub awards: Option<serde_json::Value>,
}

impl NewMovie {
    pub fn new(title: impl Into<String>, year: i32) -> Self {
        Self {
            title: title.into(),
            year,
            ..Self::default()
        }
    }
}

/// A persisted movie belonging to one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub dataset_id: DatasetId,
    #[serde(flatten)]
    pub fields: NewMovie,
}

impl Movie {
    /// The portable mapping of this movie: every field except the owning
    /// dataset and the local poster path.
    pub fn to_record(&self) -> MovieRecord {
        let f = &self.fields;
        MovieRecord {
            id: self.id,
            title: Some(f.title.clone()),
            original_title: f.original_title.clone(),
            year: Some(f.year),
            duration: f.duration,
            country: f.country.clone(),
            director: f.director.clone(),
            production_company: f.production_company.clone(),
            genre: f.genre.clone(),
            synopsis: f.synopsis.clone(),
            imdb_rating: f.imdb_rating,
            imdb_votes: f.imdb_votes,
            poster_url: f.poster_url.clone(),
            screenplay: f.screenplay.clone(),
            cast: f.cast.clone(),
            awards: f.awards.clone(),
        }
    }
}

/// A dataset of movies as currently stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDataset {
    pub id: DatasetId,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub metadata: DatasetMetadata,
    pub movies: Vec<Movie>,
}

impl MovieDataset {
    pub fn movies_count(&self) -> usize {
        self.movies.len()
    }
}

/// Read-only view of a dataset's current state. The snapshot writer depends
/// only on this, never on a live database handle.
pub trait LiveDataset {
    fn dataset_id(&self) -> DatasetId;
    fn owner_id(&self) -> UserId;
    fn snapshot_metadata(&self) -> SnapshotMetadata;
    fn snapshot_records(&self) -> Vec<MovieRecord>;
}

impl LiveDataset for MovieDataset {
    fn dataset_id(&self) -> DatasetId {
        self.id
    }

    fn owner_id(&self) -> UserId {
        self.owner_id
    }

    fn snapshot_metadata(&self) -> SnapshotMetadata {
        self.metadata.to_snapshot()
    }

    fn snapshot_records(&self) -> Vec<MovieRecord> {
        self.movies.iter().map(Movie::to_record).collect()
    }
}
