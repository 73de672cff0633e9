// ABOUTME: Module root for human-readable exporters of snapshots and diffs.
// ABOUTME: Re-exports the Markdown diff renderer and the YAML state renderer.

pub mod markdown;
pub mod yaml;

pub use markdown::export_diff_markdown;
pub use yaml::export_state_yaml;
