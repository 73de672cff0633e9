// ABOUTME: Renders a DiffReport as a deterministic Markdown change summary.
// ABOUTME: Sections: metadata changes, added records, removed records, modified records.

use std::fmt::Write;

use serde_json::Value;

use crate::diff::{DiffReport, FieldChanges};
use crate::snapshot::MovieRecord;

/// Render a diff between two labelled versions as Markdown.
///
/// Empty sections are omitted. Field values are shown as compact JSON, with
/// strings unquoted and `null` shown as `(none)`.
pub fn export_diff_markdown(report: &DiffReport, from_label: &str, to_label: &str) -> String {
    let mut out = String::new();

    writeln!(out, "# Changes from version {} to {}", from_label, to_label).unwrap();
    writeln!(out).unwrap();
    writeln!(out, "{}", report.summary()).unwrap();

    if report.is_empty() {
        writeln!(out).unwrap();
        writeln!(out, "No differences.").unwrap();
        return out;
    }

    if !report.metadata_changed.is_empty() {
        writeln!(out).unwrap();
        writeln!(out, "## Metadata").unwrap();
        writeln!(out).unwrap();
        write_changes(&mut out, &report.metadata_changed);
    }

    if !report.records_added.is_empty() {
        writeln!(out).unwrap();
        writeln!(out, "## Added movies").unwrap();
        writeln!(out).unwrap();
        for record in &report.records_added {
            writeln!(out, "- {}", record_label(record)).unwrap();
        }
    }

    if !report.records_removed.is_empty() {
        writeln!(out).unwrap();
        writeln!(out, "## Removed movies").unwrap();
        writeln!(out).unwrap();
        for record in &report.records_removed {
            writeln!(out, "- {}", record_label(record)).unwrap();
        }
    }

    if !report.records_modified.is_empty() {
        writeln!(out).unwrap();
        writeln!(out, "## Modified movies").unwrap();
        for change in &report.records_modified {
            writeln!(out).unwrap();
            writeln!(out, "### Movie #{}", change.record_id).unwrap();
            writeln!(out).unwrap();
            write_changes(&mut out, &change.changes);
        }
    }

    out
}

fn write_changes(out: &mut String, changes: &FieldChanges) {
    for (field, change) in changes {
        writeln!(
            out,
            "- `{}`: {} -> {}",
            field,
            render_value(&change.old),
            render_value(&change.new)
        )
        .unwrap();
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "(none)".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn record_label(record: &MovieRecord) -> String {
    let title = record.title.as_deref().unwrap_or("(untitled)");
    match record.year {
        Some(year) => format!("#{} {} ({})", record.id, title, year),
        None => format!("#{} {}", record.id, title),
    }
}
