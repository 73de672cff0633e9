// ABOUTME: Exports a ReconstructedState as a YAML document for human review.
// ABOUTME: Uses serde_yaml with records sorted by id for deterministic output.

use serde::Serialize;

use crate::model::DatasetId;
use crate::snapshot::{MovieRecord, ReconstructedState, SnapshotMetadata};

#[derive(Debug, Serialize)]
struct YamlDataset<'a> {
    dataset_id: DatasetId,
    metadata: &'a SnapshotMetadata,
    movies_count: usize,
    movies: Vec<&'a MovieRecord>,
}

/// Export a reconstructed dataset as YAML. Movies are ordered by id.
pub fn export_state_yaml(state: &ReconstructedState) -> Result<String, serde_yaml::Error> {
    let mut movies: Vec<&MovieRecord> = state.records.iter().collect();
    movies.sort_by_key(|record| record.id);

    serde_yaml::to_string(&YamlDataset {
        dataset_id: state.dataset_id,
        metadata: &state.metadata,
        movies_count: movies.len(),
        movies,
    })
}
