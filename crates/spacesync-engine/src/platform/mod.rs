//! Remote platform collaborator.
//!
//! The engine only needs read access to a space's structure plus
//! create/edit/delete/bulk-reorder for each entity kind. Categories have no
//! edit: their only comparable field is the position, set by reorder.

pub mod memory;

use async_trait::async_trait;
use spacesync_core::compensation::PositionEntry;
use spacesync_core::model::{
    Category, CategoryDraft, Channel, ChannelDraft, ChannelPatch, PlatformId, Role, RoleDraft,
    RolePatch, SpaceSnapshot,
};
use spacesync_core::SyncError;
use thiserror::Error;

pub use memory::{Fault, MemoryPlatform, MutationOp, MutationRecord};

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Failure reported by the platform for one call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payload has {count} overwrites (limit {cap})")]
    LimitExceeded { count: usize, cap: usize },

    #[error("Unknown {kind} {id}")]
    NotFound { kind: &'static str, id: PlatformId },

    #[error("{0}")]
    Other(String),
}

impl PlatformError {
    /// Classify into the run's error taxonomy
    pub fn into_sync(self, op: &str, entity: &str) -> SyncError {
        match self {
            PlatformError::Forbidden(message) => SyncError::Permission {
                op: op.to_string(),
                entity: entity.to_string(),
                message,
            },
            PlatformError::LimitExceeded { count, cap } => SyncError::PlatformLimit {
                entity: entity.to_string(),
                count,
                cap,
            },
            other => SyncError::Unexpected {
                op: op.to_string(),
                message: format!("{} ({})", other, entity),
            },
        }
    }
}

#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Current roles, categories and channels of a space
    async fn snapshot(&self, space: PlatformId) -> PlatformResult<SpaceSnapshot>;

    async fn create_role(&self, space: PlatformId, draft: &RoleDraft) -> PlatformResult<Role>;
    async fn edit_role(
        &self,
        space: PlatformId,
        id: PlatformId,
        patch: &RolePatch,
    ) -> PlatformResult<Role>;
    async fn delete_role(&self, space: PlatformId, id: PlatformId) -> PlatformResult<()>;
    async fn reorder_roles(
        &self,
        space: PlatformId,
        positions: &[PositionEntry],
    ) -> PlatformResult<()>;

    async fn create_category(
        &self,
        space: PlatformId,
        draft: &CategoryDraft,
    ) -> PlatformResult<Category>;
    async fn delete_category(&self, space: PlatformId, id: PlatformId) -> PlatformResult<()>;
    async fn reorder_categories(
        &self,
        space: PlatformId,
        positions: &[PositionEntry],
    ) -> PlatformResult<()>;

    async fn create_channel(
        &self,
        space: PlatformId,
        draft: &ChannelDraft,
    ) -> PlatformResult<Channel>;
    async fn edit_channel(
        &self,
        space: PlatformId,
        id: PlatformId,
        patch: &ChannelPatch,
    ) -> PlatformResult<Channel>;
    async fn delete_channel(&self, space: PlatformId, id: PlatformId) -> PlatformResult<()>;
    async fn reorder_channels(
        &self,
        space: PlatformId,
        positions: &[PositionEntry],
    ) -> PlatformResult<()>;
}
