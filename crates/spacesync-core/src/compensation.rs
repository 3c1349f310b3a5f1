//! Compensation records.
//!
//! Each successful mutation is paired with one serializable record that
//! undoes it. Records reference entities by platform id plus display key, so
//! a rollback step can be logged and inspected without touching live state.

use serde::{Deserialize, Serialize};

use crate::model::{CategoryDraft, ChannelDraft, ChannelPatch, PlatformId, RoleDraft, RolePatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Role,
    Category,
    Channel,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Role => "role",
            EntityKind::Category => "category",
            EntityKind::Channel => "channel",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A target-space entity touched by a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: PlatformId,
    /// Display name at the time of the mutation
    pub key: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: PlatformId, key: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            key: key.into(),
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.key)
    }
}

/// Pre-change values of exactly the fields an edit touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum PriorAttributes {
    Role(RolePatch),
    Channel(ChannelPatch),
}

/// Full attribute snapshot taken just before a prune-deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum EntityDraft {
    Role(RoleDraft),
    Category(CategoryDraft),
    Channel(ChannelDraft),
}

impl EntityDraft {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityDraft::Role(_) => EntityKind::Role,
            EntityDraft::Category(_) => EntityKind::Category,
            EntityDraft::Channel(_) => EntityKind::Channel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEntry {
    pub id: PlatformId,
    pub position: i32,
}

/// The inverse of one successful mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Compensation {
    /// Undo a creation
    Delete { target: EntityRef },
    /// Undo an update
    Edit {
        target: EntityRef,
        prior: PriorAttributes,
    },
    /// Undo a prune-deletion. The recreated entity gets a new id.
    Recreate {
        target: EntityRef,
        snapshot: EntityDraft,
    },
    /// Undo a bulk reorder by restoring the captured positions
    Reorder {
        entity_kind: EntityKind,
        positions: Vec<PositionEntry>,
    },
}

impl Compensation {
    /// Short label for notes and log events, e.g. `delete role Officer`
    pub fn describe(&self) -> String {
        match self {
            Compensation::Delete { target } => format!("delete {}", target),
            Compensation::Edit { target, .. } => format!("restore {}", target),
            Compensation::Recreate { target, .. } => format!("recreate {}", target),
            Compensation::Reorder {
                entity_kind,
                positions,
            } => format!(
                "restore {} {} positions",
                positions.len(),
                entity_kind.as_str()
            ),
        }
    }

    pub fn variant(&self) -> &'static str {
        match self {
            Compensation::Delete { .. } => "delete",
            Compensation::Edit { .. } => "edit",
            Compensation::Recreate { .. } => "recreate",
            Compensation::Reorder { .. } => "reorder",
        }
    }

    pub fn target(&self) -> Option<&EntityRef> {
        match self {
            Compensation::Delete { target }
            | Compensation::Edit { target, .. }
            | Compensation::Recreate { target, .. } => Some(target),
            Compensation::Reorder { .. } => None,
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self {
            Compensation::Reorder { entity_kind, .. } => *entity_kind,
            other => other.target().map(|t| t.kind).unwrap_or(EntityKind::Role),
        }
    }
}
