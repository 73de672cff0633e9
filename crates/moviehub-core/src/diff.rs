// ABOUTME: Structural differ between two reconstructed dataset states.
// ABOUTME: Reports changed metadata fields and added, removed, and modified movie records.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::MovieId;
use crate::snapshot::{MovieRecord, ReconstructedState};

/// Which input of a comparison a problem was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Older,
    Newer,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Older => f.write_str("older"),
            Side::Newer => f.write_str("newer"),
        }
    }
}

/// Errors that can occur while comparing two states.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("record id {id} appears more than once in the {side} snapshot")]
    DuplicateRecordId { side: Side, id: MovieId },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("value does not serialize to a field map")]
    NotAFieldMap,
}

/// The old and new serialized value of one field. A missing field is `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// Changed fields keyed by field name, in name order.
pub type FieldChanges = BTreeMap<String, FieldChange>;

/// A record present in both snapshots with at least one differing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordChange {
    pub record_id: MovieId,
    pub changes: FieldChanges,
}

/// Everything that differs between an older and a newer snapshot.
/// Record lists are sorted by record id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    pub metadata_changed: FieldChanges,
    pub records_added: Vec<MovieRecord>,
    pub records_removed: Vec<MovieRecord>,
    pub records_modified: Vec<RecordChange>,
}

impl DiffReport {
    /// True when the two snapshots are equivalent.
    pub fn is_empty(&self) -> bool {
        self.metadata_changed.is_empty()
            && self.records_added.is_empty()
            && self.records_removed.is_empty()
            && self.records_modified.is_empty()
    }

    /// One-line summary, e.g. "2 metadata fields, +1 -0 ~3 records".
    pub fn summary(&self) -> String {
        format!(
            "{} metadata field{}, +{} -{} ~{} records",
            self.metadata_changed.len(),
            if self.metadata_changed.len() == 1 { "" } else { "s" },
            self.records_added.len(),
            self.records_removed.len(),
            self.records_modified.len()
        )
    }
}

/// Compare two states, treating `older` as the baseline.
///
/// Metadata and each pair of same-id records are compared over the union of
/// their field names using the serialized JSON values, so `null` against a
/// real value counts as a change. Records are matched strictly by `id`; a
/// state holding the same id twice is rejected rather than guessed at.
pub fn compare(
    older: &ReconstructedState,
    newer: &ReconstructedState,
) -> Result<DiffReport, DiffError> {
    let metadata_changed = field_changes(&older.metadata, &newer.metadata)?;

    let old_records = index_records(&older.records, Side::Older)?;
    let new_records = index_records(&newer.records, Side::Newer)?;

    let records_added = new_records
        .iter()
        .filter(|(id, _)| !old_records.contains_key(*id))
        .map(|(_, record)| (*record).clone())
        .collect();

    let records_removed = old_records
        .iter()
        .filter(|(id, _)| !new_records.contains_key(*id))
        .map(|(_, record)| (*record).clone())
        .collect();

    let mut records_modified = Vec::new();
    for (id, old) in &old_records {
        if let Some(new) = new_records.get(id) {
            let changes = field_changes(*old, *new)?;
            if !changes.is_empty() {
                records_modified.push(RecordChange {
                    record_id: *id,
                    changes,
                });
            }
        }
    }

    Ok(DiffReport {
        metadata_changed,
        records_added,
        records_removed,
        records_modified,
    })
}

fn index_records(
    records: &[MovieRecord],
    side: Side,
) -> Result<BTreeMap<MovieId, &MovieRecord>, DiffError> {
    let mut by_id = BTreeMap::new();
    for record in records {
        if by_id.insert(record.id, record).is_some() {
            return Err(DiffError::DuplicateRecordId {
                side,
                id: record.id,
            });
        }
    }
    Ok(by_id)
}

fn to_field_map<T: Serialize>(value: &T) -> Result<Map<String, Value>, DiffError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(DiffError::NotAFieldMap),
    }
}

/// Per-field differences between two values of the same shape.
pub fn field_changes<T: Serialize>(old: &T, new: &T) -> Result<FieldChanges, DiffError> {
    let old = to_field_map(old)?;
    let new = to_field_map(new)?;

    let names: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    let mut changes = FieldChanges::new();
    for name in names {
        let before = old.get(name).cloned().unwrap_or(Value::Null);
        let after = new.get(name).cloned().unwrap_or(Value::Null);
        if before != after {
            changes.insert(
                name.clone(),
                FieldChange {
                    old: before,
                    new: after,
                },
            );
        }
    }
    Ok(changes)
}
