use serde::{Deserialize, Serialize};

use crate::core_types::OperatorId;
use crate::errors::{Result, SyncError};
use crate::model::PlatformId;
use crate::plan::PlanMode;

/// Persisted per-home-space sync configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_space_id: Option<PlatformId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_space_id: Option<PlatformId>,
    #[serde(default)]
    pub prune: bool,
    #[serde(default = "default_true")]
    pub sync_overwrites: bool,
    #[serde(default = "default_true")]
    pub transactional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operator_id: Option<OperatorId>,
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            source_space_id: None,
            target_space_id: None,
            prune: false,
            sync_overwrites: true,
            transactional: true,
            last_operator_id: None,
        }
    }
}

impl SyncSettings {
    /// The configured (source, target) pair.
    ///
    /// # Errors
    ///
    /// `Configuration` when either side is unset or both name the same space.
    pub fn require_spaces(&self) -> Result<(PlatformId, PlatformId)> {
        let source = self
            .source_space_id
            .ok_or_else(|| SyncError::configuration("source space is not configured"))?;
        let target = self
            .target_space_id
            .ok_or_else(|| SyncError::configuration("target space is not configured"))?;
        if source == target {
            return Err(SyncError::configuration(format!(
                "source and target are the same space ({})",
                source
            )));
        }
        Ok((source, target))
    }

    pub fn mode(&self) -> PlanMode {
        PlanMode {
            prune: self.prune,
            sync_overwrites: self.sync_overwrites,
            transactional: self.transactional,
        }
    }
}
