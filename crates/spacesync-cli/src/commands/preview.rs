//! Preview command

use clap::Args;
use spacesync_core::core_types::OperatorId;
use spacesync_core::diff::render_plan;

use crate::workspace::{Workspace, WorkspaceArgs};

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Operator requesting the preview
    #[arg(long, default_value_t = 0)]
    pub operator: u64,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(
    workspace: &WorkspaceArgs,
    args: PreviewArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::open(workspace).await?;
    let plan = ws.service.preview(ws.home, OperatorId(args.operator)).await?;

    if args.json {
        println!("{}", plan.to_json()?);
    } else {
        println!("{}", render_plan(&plan));
    }
    Ok(())
}
