//! Rollback replay.
//!
//! Walks a run's transaction log newest-first and applies each compensation.
//! A failing step is recorded and the replay moves on; rollback never stops
//! early.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;
use spacesync_core::compensation::{
    Compensation, EntityDraft, EntityKind, PositionEntry, PriorAttributes,
};
use spacesync_core::core_types::schema::EVENT_COMPENSATE;
use spacesync_core::core_types::RunContext;
use spacesync_core::model::{
    CategoryDraft, ChannelDraft, ChannelPatch, Overwrite, OverwriteTarget, ParentChange,
    PlatformId,
};
use spacesync_core::{log_op_end, log_op_start, Phase, SyncError, TransactionLog};

use crate::platform::{PlatformClient, PlatformResult};
use crate::reporter::RunJournal;

/// Outcome of one replay
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollbackReport {
    pub attempted: usize,
    pub succeeded: usize,
    #[serde(skip)]
    pub failures: Vec<SyncError>,
}

impl RollbackReport {
    /// Every compensation succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ids of entities recreated during a rollback, old id to new id.
///
/// Earlier compensations may still reference a recreated entity by its
/// deleted id: a channel's parent, an overwrite subject, a position entry.
#[derive(Debug, Default)]
pub struct IdRemap {
    ids: HashMap<PlatformId, PlatformId>,
}

impl IdRemap {
    pub fn insert(&mut self, old: PlatformId, new: PlatformId) {
        if old != new {
            self.ids.insert(old, new);
        }
    }

    pub fn resolve(&self, id: PlatformId) -> PlatformId {
        let mut current = id;
        // Chains are bounded by the number of recorded ids
        for _ in 0..=self.ids.len() {
            match self.ids.get(&current) {
                Some(next) => current = *next,
                None => break,
            }
        }
        current
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn overwrites(&self, overwrites: &[Overwrite]) -> Vec<Overwrite> {
        overwrites
            .iter()
            .map(|o| Overwrite {
                target: match o.target {
                    OverwriteTarget::Role(id) => OverwriteTarget::Role(self.resolve(id)),
                    member => member,
                },
                ..*o
            })
            .collect()
    }

    fn category_draft(&self, draft: &CategoryDraft) -> CategoryDraft {
        CategoryDraft {
            overwrites: draft.overwrites.as_deref().map(|o| self.overwrites(o)),
            ..draft.clone()
        }
    }

    fn channel_draft(&self, draft: &ChannelDraft) -> ChannelDraft {
        ChannelDraft {
            parent_id: draft.parent_id.map(|id| self.resolve(id)),
            overwrites: draft.overwrites.as_deref().map(|o| self.overwrites(o)),
            ..draft.clone()
        }
    }

    fn channel_patch(&self, patch: &ChannelPatch) -> ChannelPatch {
        ChannelPatch {
            parent: patch.parent.map(|parent| match parent {
                ParentChange::Set(id) => ParentChange::Set(self.resolve(id)),
                ParentChange::Clear => ParentChange::Clear,
            }),
            overwrites: patch.overwrites.as_deref().map(|o| self.overwrites(o)),
            ..patch.clone()
        }
    }

    fn positions(&self, positions: &[PositionEntry]) -> Vec<PositionEntry> {
        positions
            .iter()
            .map(|entry| PositionEntry {
                id: self.resolve(entry.id),
                position: entry.position,
            })
            .collect()
    }
}

/// Apply one compensation against `space`
pub async fn compensate(
    platform: &dyn PlatformClient,
    space: PlatformId,
    compensation: &Compensation,
    remap: &mut IdRemap,
) -> PlatformResult<()> {
    match compensation {
        Compensation::Delete { target } => {
            let id = remap.resolve(target.id);
            match target.kind {
                EntityKind::Role => platform.delete_role(space, id).await,
                EntityKind::Category => platform.delete_category(space, id).await,
                EntityKind::Channel => platform.delete_channel(space, id).await,
            }
        }
        Compensation::Edit { target, prior } => {
            let id = remap.resolve(target.id);
            match prior {
                PriorAttributes::Role(patch) => platform.edit_role(space, id, patch).await.map(|_| ()),
                PriorAttributes::Channel(patch) => platform
                    .edit_channel(space, id, &remap.channel_patch(patch))
                    .await
                    .map(|_| ()),
            }
        }
        Compensation::Recreate { target, snapshot } => {
            let new_id = match snapshot {
                EntityDraft::Role(draft) => platform.create_role(space, draft).await?.id,
                EntityDraft::Category(draft) => {
                    platform
                        .create_category(space, &remap.category_draft(draft))
                        .await?
                        .id
                }
                EntityDraft::Channel(draft) => {
                    platform
                        .create_channel(space, &remap.channel_draft(draft))
                        .await?
                        .id
                }
            };
            remap.insert(target.id, new_id);
            Ok(())
        }
        Compensation::Reorder {
            entity_kind,
            positions,
        } => {
            let positions = remap.positions(positions);
            match entity_kind {
                EntityKind::Role => platform.reorder_roles(space, &positions).await,
                EntityKind::Category => platform.reorder_categories(space, &positions).await,
                EntityKind::Channel => platform.reorder_channels(space, &positions).await,
            }
        }
    }
}

/// Replay `log` newest-first, recording every failure
pub async fn replay(
    platform: &dyn PlatformClient,
    space: PlatformId,
    log: TransactionLog,
    ctx: &RunContext,
    journal: &mut RunJournal,
) -> RollbackReport {
    journal.set_phase(Phase::RollingBack);
    let started = Instant::now();
    log_op_start!(
        "rollback",
        run_id = ctx.run_id.as_str(),
        space_id = space.0,
        steps = log.len()
    );

    let mut report = RollbackReport {
        attempted: log.len(),
        ..RollbackReport::default()
    };
    let mut remap = IdRemap::default();

    for compensation in log.into_rollback_order() {
        let label = compensation.describe();
        tracing::info!(
            component = module_path!(),
            op = "rollback",
            event = EVENT_COMPENSATE,
            run_id = ctx.run_id.as_str(),
            compensation = %label,
        );
        match compensate(platform, space, &compensation, &mut remap).await {
            Ok(()) => report.succeeded += 1,
            Err(err) => {
                let failure = SyncError::RollbackPartialFailure {
                    compensation: label,
                    message: err.to_string(),
                };
                tracing::warn!(
                    component = module_path!(),
                    op = "rollback",
                    run_id = ctx.run_id.as_str(),
                    error = %failure,
                    "compensation failed"
                );
                journal.note(failure.to_string());
                report.failures.push(failure);
            }
        }
    }

    log_op_end!(
        "rollback",
        duration_ms = started.elapsed().as_millis() as u64,
        run_id = ctx.run_id.as_str(),
        succeeded = report.succeeded,
        failed = report.failures.len()
    );
    journal.note(format!(
        "Rolled back {} of {} changes",
        report.succeeded, report.attempted
    ));
    report
}
