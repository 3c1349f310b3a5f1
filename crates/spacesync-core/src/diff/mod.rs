//! Diff engine.
//!
//! Pure comparison of two snapshots into per-collection create, update and
//! delete sets. Nothing here suspends or performs I/O.

pub mod engine;
pub mod human_summary;
pub mod model;

pub use engine::{
    category_changes, channel_changes, comparable_overwrites, compute_diff, diff_keyed,
    role_changes, DiffOptions,
};
pub use human_summary::render_plan;
pub use model::{ChangedField, CollectionDiff, DiffSummary, DiffTotals, UpdateEntry};
