//! Apply engine.
//!
//! Executes a plan against the target in dependency order: roles, then
//! categories, then channels, then category pruning. Every successful
//! mutation pushes exactly one compensation before the next call starts.
//! Any fatal error stops the run; in transactional mode the transaction log
//! is replayed before the error is reported.

mod roles;
mod structure;
mod translate;

use std::time::Instant;

use serde::Serialize;
use spacesync_core::compensation::{Compensation, EntityKind, PositionEntry};
use spacesync_core::core_types::RunContext;
use spacesync_core::diff::DiffTotals;
use spacesync_core::keys::{Keyed, KeyedSpace};
use spacesync_core::model::{Category, Channel, PlatformId, Role, SpaceSnapshot};
use spacesync_core::{
    log_op_end, log_op_error, log_op_start, Phase, Plan, PlanMode, Result, SyncError,
    TransactionLog,
};

use crate::platform::{PlatformClient, PlatformResult};
use crate::reporter::RunJournal;
use crate::rollback::{self, RollbackReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Completed,
    /// Failed, then the transaction log was replayed
    RolledBack,
    /// Failed with partial state left in place
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyCounts {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Entities moved by bulk reorders
    pub reordered: usize,
}

/// What one apply run did
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub outcome: ApplyOutcome,
    pub counts: ApplyCounts,
    /// Compensations recorded before the run ended
    pub compensations: usize,
    pub notes: Vec<String>,
    pub error: Option<SyncError>,
    pub rollback: Option<RollbackReport>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.outcome == ApplyOutcome::Completed
    }

    /// One line for the status surface and the CLI
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{} created, {} updated, {} deleted, {} repositioned",
            self.counts.created, self.counts.updated, self.counts.deleted, self.counts.reordered
        );
        if let Some(rollback) = &self.rollback {
            line.push_str(&format!(
                "; rolled back {} of {} changes",
                rollback.succeeded, rollback.attempted
            ));
        }
        line
    }
}

/// Apply-time settings taken from the plan and the engine config
#[derive(Debug, Clone, Copy)]
pub struct ApplyOptions {
    pub mode: PlanMode,
    pub overwrite_cap: usize,
}

/// Run one apply against `target`, re-reading both spaces first.
///
/// `previewed` holds the totals the operator confirmed; a note is emitted if
/// the fresh snapshots no longer produce the same work.
pub async fn execute(
    platform: &dyn PlatformClient,
    ctx: &RunContext,
    source: PlatformId,
    target: PlatformId,
    options: ApplyOptions,
    previewed: Option<DiffTotals>,
    journal: &mut RunJournal,
) -> ApplyReport {
    journal.set_phase(Phase::Preparing);
    let started = Instant::now();
    log_op_start!("apply", run_id = ctx.run_id.as_str(), space_id = target.0);

    let snapshots = read_spaces(platform, source, target).await;
    let (source_snapshot, target_snapshot) = match snapshots {
        Ok(pair) => pair,
        Err(err) => {
            log_op_error!(
                "apply",
                err.clone(),
                duration_ms = started.elapsed().as_millis() as u64,
                run_id = ctx.run_id.as_str()
            );
            journal.note(format!("Could not read spaces: {}", err));
            journal.set_phase(Phase::Failed);
            return finish_report(
                journal,
                ApplyOutcome::Failed,
                ApplyCounts::default(),
                0,
                Some(err),
                None,
            );
        }
    };

    if let Some(previewed) = previewed {
        let fresh = Plan::build(&source_snapshot, &target_snapshot, options.mode).applied_totals();
        if fresh != previewed {
            journal.note(format!(
                "Spaces changed since the preview: now {} to create, {} to update, {} to delete",
                fresh.create, fresh.update, fresh.delete
            ));
        }
    }

    let mut run = ApplyRun {
        platform,
        ctx,
        journal,
        options,
        source: source_snapshot,
        target: target_snapshot,
        log: TransactionLog::new(),
        counts: ApplyCounts::default(),
    };
    let result = run.apply_all().await;
    let ApplyRun {
        journal,
        log,
        counts,
        ..
    } = run;
    let compensations = log.len();

    match result {
        Ok(()) => {
            log_op_end!(
                "apply",
                duration_ms = started.elapsed().as_millis() as u64,
                run_id = ctx.run_id.as_str(),
                mutations = compensations
            );
            journal.set_phase(Phase::Complete);
            finish_report(
                journal,
                ApplyOutcome::Completed,
                counts,
                compensations,
                None,
                None,
            )
        }
        Err(err) => {
            log_op_error!(
                "apply",
                err.clone(),
                duration_ms = started.elapsed().as_millis() as u64,
                run_id = ctx.run_id.as_str()
            );
            journal.note(format!("Stopped: {}", err));
            let (outcome, rollback) = if options.mode.transactional {
                let report = rollback::replay(platform, target, log, ctx, journal).await;
                (ApplyOutcome::RolledBack, Some(report))
            } else {
                journal.note("Non-transactional run: changes made so far were kept");
                (ApplyOutcome::Failed, None)
            };
            journal.set_phase(Phase::Failed);
            finish_report(journal, outcome, counts, compensations, Some(err), rollback)
        }
    }
}

async fn read_spaces(
    platform: &dyn PlatformClient,
    source: PlatformId,
    target: PlatformId,
) -> Result<(SpaceSnapshot, SpaceSnapshot)> {
    let source = platform
        .snapshot(source)
        .await
        .map_err(|e| e.into_sync("snapshot", "source space"))?;
    let target = platform
        .snapshot(target)
        .await
        .map_err(|e| e.into_sync("snapshot", "target space"))?;
    Ok((source, target))
}

fn finish_report(
    journal: &mut RunJournal,
    outcome: ApplyOutcome,
    counts: ApplyCounts,
    compensations: usize,
    error: Option<SyncError>,
    rollback: Option<RollbackReport>,
) -> ApplyReport {
    let mut report = ApplyReport {
        outcome,
        counts,
        compensations,
        notes: Vec::new(),
        error,
        rollback,
    };
    journal.board().set_summary(report.summary_line());
    report.notes = journal.lines().to_vec();
    report
}

/// Per-run mutable state. Owned by one run, never shared.
pub(crate) struct ApplyRun<'a> {
    platform: &'a dyn PlatformClient,
    ctx: &'a RunContext,
    journal: &'a mut RunJournal,
    options: ApplyOptions,
    source: SpaceSnapshot,
    /// Live view of the target, kept in step with every mutation
    target: SpaceSnapshot,
    log: TransactionLog,
    counts: ApplyCounts,
}

impl<'a> ApplyRun<'a> {
    async fn apply_all(&mut self) -> Result<()> {
        self.journal.set_phase(Phase::Roles);
        self.sync_roles().await?;

        self.journal.set_phase(Phase::Categories);
        self.sync_categories().await?;

        self.journal.set_phase(Phase::Channels);
        self.sync_channels().await?;
        self.prune_categories().await?;
        Ok(())
    }

    fn target_id(&self) -> PlatformId {
        self.target.space_id
    }

    fn note(&mut self, text: impl Into<String>) {
        self.journal.note(text);
    }

    fn begin(&self, op: &'static str, entity: &str) -> Instant {
        log_op_start!(
            op,
            run_id = self.ctx.run_id.as_str(),
            space_id = self.target.space_id.0,
            entity_key = entity
        );
        Instant::now()
    }

    /// Log the outcome of one platform call.
    ///
    /// Fatal errors are returned; non-fatal ones become a note and `None`.
    fn settle<T>(
        &mut self,
        op: &'static str,
        entity: &str,
        started: Instant,
        result: PlatformResult<T>,
    ) -> Result<Option<T>> {
        let duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(value) => {
                log_op_end!(
                    op,
                    duration_ms = duration_ms,
                    run_id = self.ctx.run_id.as_str()
                );
                Ok(Some(value))
            }
            Err(err) => {
                let err = err.into_sync(op, entity);
                log_op_error!(
                    op,
                    err.clone(),
                    duration_ms = duration_ms,
                    run_id = self.ctx.run_id.as_str()
                );
                if err.aborts_run() {
                    Err(err)
                } else {
                    self.note(err.to_string());
                    Ok(None)
                }
            }
        }
    }

    fn commit(&mut self, compensation: Compensation) {
        self.log.push(compensation);
    }

    /// Bulk-move one entity kind to the source's positions.
    ///
    /// Skipped entirely when nothing would move.
    async fn reorder(&mut self, kind: EntityKind) -> Result<()> {
        let platform = self.platform;
        let moves = {
            let src = KeyedSpace::new(&self.source);
            let tgt = KeyedSpace::new(&self.target);
            match kind {
                EntityKind::Role => {
                    position_moves(&src.roles, &tgt.roles, |r: &Role| (r.id, r.position))
                }
                EntityKind::Category => position_moves(
                    &src.categories,
                    &tgt.categories,
                    |c: &Category| (c.id, c.position),
                ),
                EntityKind::Channel => position_moves(
                    &src.channels,
                    &tgt.channels,
                    |c: &Channel| (c.id, c.position),
                ),
            }
        };
        if moves.is_empty() {
            return Ok(());
        }

        let (wanted, prior): (Vec<PositionEntry>, Vec<PositionEntry>) = moves.into_iter().unzip();
        let op = match kind {
            EntityKind::Role => "reorder_roles",
            EntityKind::Category => "reorder_categories",
            EntityKind::Channel => "reorder_channels",
        };
        let started = self.begin(op, kind.as_str());
        let result = match kind {
            EntityKind::Role => platform.reorder_roles(self.target_id(), &wanted).await,
            EntityKind::Category => platform.reorder_categories(self.target_id(), &wanted).await,
            EntityKind::Channel => platform.reorder_channels(self.target_id(), &wanted).await,
        };
        if self.settle(op, kind.as_str(), started, result)?.is_none() {
            return Ok(());
        }
        self.commit(Compensation::Reorder {
            entity_kind: kind,
            positions: prior,
        });

        for entry in &wanted {
            self.set_local_position(kind, entry);
        }
        self.counts.reordered += wanted.len();
        self.note(format!("Repositioned {} {}(s)", wanted.len(), kind));
        Ok(())
    }

    fn set_local_position(&mut self, kind: EntityKind, entry: &PositionEntry) {
        let slot = match kind {
            EntityKind::Role => self
                .target
                .roles
                .iter_mut()
                .find(|r| r.id == entry.id)
                .map(|r| &mut r.position),
            EntityKind::Category => self
                .target
                .categories
                .iter_mut()
                .find(|c| c.id == entry.id)
                .map(|c| &mut c.position),
            EntityKind::Channel => self
                .target
                .channels
                .iter_mut()
                .find(|c| c.id == entry.id)
                .map(|c| &mut c.position),
        };
        if let Some(position) = slot {
            *position = entry.position;
        }
    }
}

/// (wanted, prior) position pairs for paired entities whose position differs
fn position_moves<K, T>(
    source: &Keyed<'_, K, T>,
    target: &Keyed<'_, K, T>,
    placement: impl Fn(&T) -> (PlatformId, i32),
) -> Vec<(PositionEntry, PositionEntry)>
where
    K: Ord + Clone,
{
    source
        .iter()
        .filter_map(|(key, item)| {
            let existing = target.get(key)?;
            let (_, wanted) = placement(item);
            let (id, current) = placement(existing);
            (wanted != current).then_some((
                PositionEntry {
                    id,
                    position: wanted,
                },
                PositionEntry {
                    id,
                    position: current,
                },
            ))
        })
        .collect()
}
