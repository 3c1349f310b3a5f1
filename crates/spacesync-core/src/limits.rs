//! Platform ceilings enforced before a payload leaves the engine.

use crate::errors::SyncError;
use crate::model::Overwrite;

/// Most overwrite entries the platform accepts on one entity
pub const OVERWRITE_CAP: usize = 100;

/// Outcome of checking an overwrite set against the ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverwriteGuard {
    /// Within the ceiling; send as-is
    Send(Vec<Overwrite>),
    /// Over the ceiling; the overwrites field must be left out
    Omit { count: usize },
}

impl OverwriteGuard {
    /// The payload value: `None` leaves the field out of the request
    pub fn into_payload(self) -> Option<Vec<Overwrite>> {
        match self {
            OverwriteGuard::Send(overwrites) => Some(overwrites),
            OverwriteGuard::Omit { .. } => None,
        }
    }

    /// The non-fatal limit error describing an omission
    pub fn limit_error(&self, entity: &str, cap: usize) -> Option<SyncError> {
        match self {
            OverwriteGuard::Send(_) => None,
            OverwriteGuard::Omit { count } => Some(SyncError::PlatformLimit {
                entity: entity.to_string(),
                count: *count,
                cap,
            }),
        }
    }
}

/// Check an overwrite set against `cap`.
///
/// `source_count` is the size of the set as the source defines it, which may
/// be larger than the translated set when some subjects had no counterpart.
pub fn guard_overwrites(overwrites: Vec<Overwrite>, source_count: usize, cap: usize) -> OverwriteGuard {
    let count = source_count.max(overwrites.len());
    if count > cap {
        OverwriteGuard::Omit { count }
    } else {
        OverwriteGuard::Send(overwrites)
    }
}
