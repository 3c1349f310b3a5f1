//! SpaceSync Core - in-memory kernel of the structure mirror
//!
//! This crate provides the synchronous building blocks of a sync run:
//! - Role, category and channel models with their create drafts and edit patches
//! - Case-insensitive keying with a deterministic duplicate tie-break
//! - The pure diff engine and the immutable [`Plan`] shown before any mutation
//! - Compensation records and the run-scoped [`TransactionLog`]
//! - The [`StatusBoard`] state behind the progress reporter
//! - The confirmation state machine
//! - The error and logging facilities
//!
//! Everything here is free of I/O; the async orchestration lives in
//! `spacesync-engine`.

pub mod compensation;
pub mod confirmation;
pub mod diff;
pub mod errors;
pub mod keys;
pub mod limits;
pub mod logging_facility;
pub mod model;
pub mod plan;
pub mod saga;
pub mod settings;
pub mod status_board;

pub use spacesync_core_types as core_types;

// Re-export commonly used types
pub use compensation::{Compensation, EntityKind, EntityRef};
pub use confirmation::{Confirmation, ConfirmationEvent, ConfirmationState, NextAction};
pub use diff::{compute_diff, DiffOptions, DiffSummary};
pub use errors::{ExError, ExErrorKind, Result, SyncError};
pub use model::{Category, Channel, ChannelKind, PlatformId, Role, SpaceSnapshot};
pub use plan::{Plan, PlanMode};
pub use saga::TransactionLog;
pub use settings::SyncSettings;
pub use status_board::{Phase, StatusBoard};
