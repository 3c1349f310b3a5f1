//! The immutable plan shown to the operator before any mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::{compute_diff, DiffOptions, DiffSummary, DiffTotals};
use crate::errors::Result;
use crate::model::{PlatformId, SpaceSnapshot};

/// Identity of one side of a sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceRef {
    pub id: PlatformId,
    pub name: String,
}

impl SpaceRef {
    pub fn of(snapshot: &SpaceSnapshot) -> Self {
        Self {
            id: snapshot.space_id,
            name: snapshot.name.clone(),
        }
    }
}

/// Apply-time switches captured with the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMode {
    pub prune: bool,
    pub sync_overwrites: bool,
    pub transactional: bool,
}

impl Default for PlanMode {
    fn default() -> Self {
        Self {
            prune: false,
            sync_overwrites: true,
            transactional: true,
        }
    }
}

impl PlanMode {
    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            compare_overwrites: self.sync_overwrites,
        }
    }
}

/// Counts and named items for one preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub source: SpaceRef,
    pub target: SpaceRef,
    pub mode: PlanMode,
    pub diff: DiffSummary,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn build(source: &SpaceSnapshot, target: &SpaceSnapshot, mode: PlanMode) -> Self {
        Self {
            source: SpaceRef::of(source),
            target: SpaceRef::of(target),
            mode,
            diff: compute_diff(source, target, mode.diff_options()),
            created_at: Utc::now(),
        }
    }

    /// Raw diff totals, deletes included whatever the mode
    pub fn totals(&self) -> DiffTotals {
        self.diff.totals()
    }

    /// Totals of what an apply would actually do; deletes only under prune
    pub fn applied_totals(&self) -> DiffTotals {
        let mut totals = self.diff.totals();
        if !self.mode.prune {
            totals.delete = 0;
        }
        totals
    }

    /// True when an apply would create, update or delete nothing
    pub fn is_noop(&self) -> bool {
        self.applied_totals().is_zero()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::{Category, Role};

    fn spaces() -> (SpaceSnapshot, SpaceSnapshot) {
        let mut source = SpaceSnapshot::new(PlatformId(1), "Main");
        source.roles.push(Role {
            id: PlatformId(10),
            name: "Officer".to_string(),
            color: 0,
            hoist: true,
            mentionable: false,
            permissions: Default::default(),
            position: 1,
            is_default: false,
            managed: false,
        });
        let mut target = SpaceSnapshot::new(PlatformId(2), "Mirror");
        target.categories.push(Category {
            id: PlatformId(20),
            name: "Old".to_string(),
            position: 0,
            overwrites: vec![],
        });
        (source, target)
    }

    #[test]
    fn test_deletes_only_count_under_prune() {
        let (source, target) = spaces();
        let plan = Plan::build(&source, &target, PlanMode::default());
        assert_eq!(plan.totals().delete, 1);
        assert_eq!(plan.applied_totals().delete, 0);
        assert_eq!(plan.applied_totals().create, 1);

        let pruning = Plan::build(
            &source,
            &target,
            PlanMode {
                prune: true,
                ..PlanMode::default()
            },
        );
        assert_eq!(pruning.applied_totals().delete, 1);
    }

    #[test]
    fn test_plan_exports_as_json() {
        let (source, target) = spaces();
        let plan = Plan::build(&source, &target, PlanMode::default());
        let json: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
        assert_eq!(json["source"]["name"], "Main");
        assert_eq!(json["diff"]["roles"]["create"][0], "Officer");
    }
}
