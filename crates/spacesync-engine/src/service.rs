//! Sync service.
//!
//! Operator-facing entry points keyed by the home space: configuration,
//! preview, and the confirm-then-apply run.
//!
//! ## Logging Ownership
//!
//! The service owns lifecycle logging for preview and run:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Per-mutation events are logged by the apply engine.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use spacesync_core::core_types::{OperatorId, RunContext};
use spacesync_core::diff::render_plan;
use spacesync_core::model::{PlatformId, SpaceSnapshot};
use spacesync_core::{
    log_op_end, log_op_error, log_op_start, Confirmation, ConfirmationEvent, ConfirmationState,
    Plan, Result, StatusBoard, SyncError, SyncSettings,
};
use tokio::sync::mpsc;

use crate::apply::{self, ApplyOptions, ApplyReport};
use crate::config::EngineConfig;
use crate::platform::{PlatformClient, PlatformError};
use crate::reporter::{BoardHandle, Reporter, RunJournal};
use crate::settings_store::SettingsStore;
use crate::surface::StatusSurface;
use crate::workflow::{await_decision, ConfirmationSurface};

/// How a confirmed-or-not run ended
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Applied(ApplyReport),
    Cancelled,
    TimedOut,
}

/// Marks a target space as busy until dropped
#[derive(Debug)]
pub struct RunGuard {
    active: Arc<Mutex<HashSet<PlatformId>>>,
    space: PlatformId,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.space);
        }
    }
}

pub struct SyncService {
    platform: Arc<dyn PlatformClient>,
    settings: Arc<dyn SettingsStore>,
    surface: Arc<dyn StatusSurface>,
    config: EngineConfig,
    active_runs: Arc<Mutex<HashSet<PlatformId>>>,
}

impl SyncService {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        settings: Arc<dyn SettingsStore>,
        surface: Arc<dyn StatusSurface>,
        config: EngineConfig,
    ) -> Self {
        Self {
            platform,
            settings,
            surface,
            config,
            active_runs: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current settings of `home`
    ///
    /// # Errors
    ///
    /// `Settings`/`Serialization` when the store cannot be read.
    pub async fn settings(&self, home: PlatformId) -> Result<SyncSettings> {
        self.settings.load(home).await
    }

    /// Select the source and target for `home`
    ///
    /// # Errors
    ///
    /// `Configuration` when both name the same space; store errors otherwise.
    pub async fn configure_spaces(
        &self,
        home: PlatformId,
        source: PlatformId,
        target: PlatformId,
    ) -> Result<SyncSettings> {
        if source == target {
            return Err(SyncError::configuration(format!(
                "source and target are the same space ({})",
                source
            )));
        }
        self.update(home, |s| {
            s.source_space_id = Some(source);
            s.target_space_id = Some(target);
        })
        .await
    }

    /// # Errors
    ///
    /// Store errors.
    pub async fn configure_prune(&self, home: PlatformId, prune: bool) -> Result<SyncSettings> {
        self.update(home, |s| s.prune = prune).await
    }

    /// # Errors
    ///
    /// Store errors.
    pub async fn configure_sync_overwrites(
        &self,
        home: PlatformId,
        sync_overwrites: bool,
    ) -> Result<SyncSettings> {
        self.update(home, |s| s.sync_overwrites = sync_overwrites)
            .await
    }

    /// # Errors
    ///
    /// Store errors.
    pub async fn configure_transactional(
        &self,
        home: PlatformId,
        transactional: bool,
    ) -> Result<SyncSettings> {
        self.update(home, |s| s.transactional = transactional).await
    }

    async fn update(
        &self,
        home: PlatformId,
        change: impl FnOnce(&mut SyncSettings) + Send,
    ) -> Result<SyncSettings> {
        let mut settings = self.settings.load(home).await?;
        change(&mut settings);
        self.settings.save(home, &settings).await?;
        Ok(settings)
    }

    /// Snapshot both spaces and compute the plan. Mutates nothing remote.
    ///
    /// # Errors
    ///
    /// `Configuration` when the pair is unset, identical or unreadable.
    pub async fn preview(&self, home: PlatformId, operator: OperatorId) -> Result<Plan> {
        log_op_start!("preview", space_id = home.0, operator_id = operator.0);
        let start = Instant::now();

        let result = self.preview_impl(home, operator).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(plan) => {
                let totals = plan.totals();
                log_op_end!(
                    "preview",
                    duration_ms = duration_ms,
                    create = totals.create,
                    update = totals.update,
                    delete = totals.delete
                );
            }
            Err(err) => {
                log_op_error!("preview", err.clone(), duration_ms = duration_ms);
            }
        }
        result
    }

    async fn preview_impl(&self, home: PlatformId, operator: OperatorId) -> Result<Plan> {
        let mut settings = self.settings.load(home).await?;
        let (source_id, target_id) = settings.require_spaces()?;

        let source = self.read_space(source_id, "source").await?;
        let target = self.read_space(target_id, "target").await?;
        let plan = Plan::build(&source, &target, settings.mode());

        settings.last_operator_id = Some(operator);
        self.settings.save(home, &settings).await?;
        Ok(plan)
    }

    async fn read_space(&self, id: PlatformId, role: &str) -> Result<SpaceSnapshot> {
        self.platform.snapshot(id).await.map_err(|err| match err {
            PlatformError::NotFound { .. } | PlatformError::Forbidden(_) => {
                SyncError::configuration(format!("{} space {} is not accessible: {}", role, id, err))
            }
            other => other.into_sync("snapshot", role),
        })
    }

    /// Preview, wait for the operator, then apply.
    ///
    /// The target space is held for the whole run; a concurrent run against
    /// it is rejected before anything is shown.
    ///
    /// # Errors
    ///
    /// `RunInProgress`, `Configuration` or store errors before the preview;
    /// `InvalidTransition` if the confirmation is misdriven. Apply failures
    /// are reported in the returned [`ApplyReport`].
    pub async fn run(
        &self,
        home: PlatformId,
        ctx: &RunContext,
        confirm: &dyn ConfirmationSurface,
        mut actions: mpsc::Receiver<ConfirmationEvent>,
    ) -> Result<RunOutcome> {
        log_op_start!("run", run_id = ctx.run_id.as_str(), space_id = home.0);
        let start = Instant::now();

        let result = self.run_impl(home, ctx, confirm, &mut actions).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => {
                let outcome = match outcome {
                    RunOutcome::Applied(report) => {
                        if report.is_success() {
                            "applied"
                        } else {
                            "failed"
                        }
                    }
                    RunOutcome::Cancelled => "cancelled",
                    RunOutcome::TimedOut => "timed_out",
                };
                log_op_end!(
                    "run",
                    duration_ms = duration_ms,
                    run_id = ctx.run_id.as_str(),
                    outcome = outcome
                );
            }
            Err(err) => {
                log_op_error!(
                    "run",
                    err.clone(),
                    duration_ms = duration_ms,
                    run_id = ctx.run_id.as_str()
                );
            }
        }
        result
    }

    async fn run_impl(
        &self,
        home: PlatformId,
        ctx: &RunContext,
        confirm: &dyn ConfirmationSurface,
        actions: &mut mpsc::Receiver<ConfirmationEvent>,
    ) -> Result<RunOutcome> {
        let (_, target) = self.settings.load(home).await?.require_spaces()?;
        let _guard = self.try_begin_run(target)?;

        let plan = self.preview(home, ctx.operator_id).await?;
        let rendered = render_plan(&plan);
        confirm
            .show_preview(ctx.operator_id, &plan, &rendered)
            .await
            .map_err(|e| SyncError::Unexpected {
                op: "show_preview".to_string(),
                message: e.to_string(),
            })?;

        let mut confirmation = Confirmation::new(ctx.operator_id);
        let state = await_decision(
            confirm,
            &mut confirmation,
            actions,
            self.config.confirmation_timeout(),
        )
        .await?;

        match state {
            ConfirmationState::Confirmed => Ok(RunOutcome::Applied(self.execute(ctx, &plan).await)),
            ConfirmationState::Cancelled => Ok(RunOutcome::Cancelled),
            ConfirmationState::TimedOut | ConfirmationState::Previewing => Ok(RunOutcome::TimedOut),
        }
    }

    /// Apply an already-confirmed plan
    ///
    /// # Errors
    ///
    /// `RunInProgress` when the plan's target already has a run in flight.
    pub async fn apply_plan(&self, ctx: &RunContext, plan: &Plan) -> Result<ApplyReport> {
        let _guard = self.try_begin_run(plan.target.id)?;
        Ok(self.execute(ctx, plan).await)
    }

    /// Claim `target` for one run
    ///
    /// # Errors
    ///
    /// `RunInProgress` when another run holds it.
    pub fn try_begin_run(&self, target: PlatformId) -> Result<RunGuard> {
        let mut active = self.active_runs.lock().map_err(|_| SyncError::Unexpected {
            op: "run".to_string(),
            message: "run registry lock poisoned".to_string(),
        })?;
        if !active.insert(target) {
            return Err(SyncError::RunInProgress { space_id: target.0 });
        }
        Ok(RunGuard {
            active: Arc::clone(&self.active_runs),
            space: target,
        })
    }

    async fn execute(&self, ctx: &RunContext, plan: &Plan) -> ApplyReport {
        let board = BoardHandle::new(StatusBoard::new(
            format!("Sync {} -> {}", plan.source.name, plan.target.name),
            self.config.note_line_cap,
        ));
        let reporter = Reporter::start(
            Arc::clone(&self.surface),
            board.clone(),
            self.config.flush_interval(),
        )
        .await;
        let mut journal = RunJournal::new(board);

        let options = ApplyOptions {
            mode: plan.mode,
            overwrite_cap: self.config.overwrite_cap,
        };
        let report = apply::execute(
            self.platform.as_ref(),
            ctx,
            plan.source.id,
            plan.target.id,
            options,
            Some(plan.applied_totals()),
            &mut journal,
        )
        .await;

        reporter.finish().await;
        report
    }
}
