//! Configure command

use clap::Args;
use spacesync_core::model::PlatformId;

use crate::commands::show::print_settings;
use crate::workspace::{Workspace, WorkspaceArgs};

#[derive(Debug, Args)]
pub struct ConfigureArgs {
    /// Space to copy structure from
    #[arg(long, requires = "target")]
    pub source: Option<u64>,

    /// Space to copy structure onto
    #[arg(long, requires = "source")]
    pub target: Option<u64>,

    /// Delete target entities with no source counterpart
    #[arg(long)]
    pub prune: Option<bool>,

    /// Copy permission overwrites
    #[arg(long)]
    pub sync_overwrites: Option<bool>,

    /// Roll back on failure
    #[arg(long)]
    pub transactional: Option<bool>,
}

pub async fn execute(
    workspace: &WorkspaceArgs,
    args: ConfigureArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::open(workspace).await?;
    let service = &ws.service;

    if let (Some(source), Some(target)) = (args.source, args.target) {
        service
            .configure_spaces(ws.home, PlatformId(source), PlatformId(target))
            .await?;
    }
    if let Some(prune) = args.prune {
        service.configure_prune(ws.home, prune).await?;
    }
    if let Some(sync) = args.sync_overwrites {
        service.configure_sync_overwrites(ws.home, sync).await?;
    }
    if let Some(transactional) = args.transactional {
        service.configure_transactional(ws.home, transactional).await?;
    }

    print_settings(&service.settings(ws.home).await?);
    Ok(())
}
