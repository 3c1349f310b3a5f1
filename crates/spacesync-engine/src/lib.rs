//! SpaceSync Engine - async orchestration layer
//!
//! Coordinates the pure kernel in `spacesync-core` with the outside world:
//! the platform client, the status surface and the operator's confirmation.
//! A run flows through [`service::SyncService`]: preview, confirm, then
//! apply with saga rollback on failure while the reporter coalesces
//! progress notes into periodic surface edits.

pub mod apply;
pub mod config;
pub mod platform;
pub mod reporter;
pub mod rollback;
pub mod service;
pub mod settings_store;
pub mod surface;
pub mod workflow;

pub use apply::{ApplyOutcome, ApplyReport};
pub use config::EngineConfig;
pub use platform::{MemoryPlatform, PlatformClient, PlatformError};
pub use reporter::{BoardHandle, Reporter};
pub use rollback::RollbackReport;
pub use service::{RunOutcome, SyncService};
pub use settings_store::{MemorySettingsStore, SettingsStore, TomlSettingsStore};
pub use surface::{MemorySurface, StatusSurface};
pub use workflow::ConfirmationSurface;
