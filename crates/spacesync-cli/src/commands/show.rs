//! Show command

use clap::Args;
use spacesync_core::{PlatformId, SyncSettings};

use crate::workspace::{Workspace, WorkspaceArgs};

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Print the settings as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(
    workspace: &WorkspaceArgs,
    args: ShowArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::open(workspace).await?;
    let settings = ws.service.settings(ws.home).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    print_settings(&settings);
    println!();
    for space in ws.spaces().await {
        println!(
            "{} {:?}: {} roles, {} categories, {} channels",
            space.space_id,
            space.name,
            space.roles.len(),
            space.categories.len(),
            space.channels.len()
        );
    }
    Ok(())
}

pub fn print_settings(settings: &SyncSettings) {
    println!("source:          {}", space_or_unset(settings.source_space_id));
    println!("target:          {}", space_or_unset(settings.target_space_id));
    println!("prune:           {}", settings.prune);
    println!("sync overwrites: {}", settings.sync_overwrites);
    println!("transactional:   {}", settings.transactional);
}

fn space_or_unset(id: Option<PlatformId>) -> String {
    id.map(|id| id.to_string())
        .unwrap_or_else(|| "(unset)".to_string())
}
