//! Run command

use clap::Args;
use spacesync_core::core_types::{OperatorId, RunContext};
use spacesync_engine::RunOutcome;
use tokio::sync::mpsc;

use crate::console::ConsoleConfirmation;
use crate::workspace::{Workspace, WorkspaceArgs};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Operator driving the run
    #[arg(long, default_value_t = 0)]
    pub operator: u64,

    /// Accept the preview without asking
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub async fn execute(
    workspace: &WorkspaceArgs,
    args: RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::open(workspace).await?;
    let ctx = RunContext::new(OperatorId(args.operator));
    let (tx, rx) = mpsc::channel(4);
    let confirm = ConsoleConfirmation::new(tx, args.yes);

    match ws.service.run(ws.home, &ctx, &confirm, rx).await? {
        RunOutcome::Applied(report) => {
            // Rolled back or not, the platform state may have moved
            ws.save().await?;
            println!("{}", report.summary_line());
            if let Some(err) = report.error {
                return Err(Box::new(err));
            }
            Ok(())
        }
        RunOutcome::Cancelled | RunOutcome::TimedOut => Ok(()),
    }
}
