//! Local state shared by every command: the space dump, the settings file
//! and the engine config.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use serde::{Deserialize, Serialize};
use spacesync_core::model::{PlatformId, SpaceSnapshot};
use spacesync_engine::{EngineConfig, MemoryPlatform, SyncService, TomlSettingsStore};

use crate::console::ConsoleSurface;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Args)]
pub struct WorkspaceArgs {
    /// JSON dump of the spaces the platform serves
    #[arg(long, global = true, default_value = ".spacesync/spaces.json")]
    pub state: PathBuf,

    /// Per-home settings file
    #[arg(long, global = true, default_value = ".spacesync/settings.toml")]
    pub settings: PathBuf,

    /// Engine config file; missing means defaults
    #[arg(long, global = true, default_value = ".spacesync/config.toml")]
    pub config: PathBuf,

    /// Home space the settings belong to
    #[arg(long, global = true, default_value_t = 0)]
    pub home: u64,
}

/// On-disk form of the platform state
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SpaceDump {
    #[serde(default)]
    pub spaces: Vec<SpaceSnapshot>,
}

impl SpaceDump {
    pub async fn read(path: &Path) -> CliResult<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(serde_json::from_str(&text)
                .map_err(|e| format!("{}: {}", path.display(), e))?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(format!("cannot read {}: {}", path.display(), e).into()),
        }
    }

    pub async fn write(&self, path: &Path) -> CliResult<()> {
        ensure_parent(path).await?;
        let text = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, text).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}

pub struct Workspace {
    pub home: PlatformId,
    pub platform: Arc<MemoryPlatform>,
    pub service: SyncService,
    state_path: PathBuf,
    space_ids: Vec<PlatformId>,
}

impl Workspace {
    pub async fn open(args: &WorkspaceArgs) -> CliResult<Self> {
        let config = EngineConfig::load(&args.config).await?.with_env_overrides()?;
        let dump = SpaceDump::read(&args.state).await?;
        let space_ids = dump.spaces.iter().map(|s| s.space_id).collect();
        ensure_parent(&args.settings).await?;

        let platform = Arc::new(MemoryPlatform::with_spaces(dump.spaces));
        let service = SyncService::new(
            platform.clone(),
            Arc::new(TomlSettingsStore::new(&args.settings)),
            Arc::new(ConsoleSurface),
            config,
        );
        Ok(Self {
            home: PlatformId(args.home),
            platform,
            service,
            state_path: args.state.clone(),
            space_ids,
        })
    }

    pub async fn spaces(&self) -> Vec<SpaceSnapshot> {
        let mut spaces = Vec::with_capacity(self.space_ids.len());
        for id in &self.space_ids {
            if let Some(space) = self.platform.space(*id).await {
                spaces.push(space);
            }
        }
        spaces
    }

    /// Write the platform's current spaces back to the dump
    pub async fn save(&self) -> CliResult<()> {
        let dump = SpaceDump {
            spaces: self.spaces().await,
        };
        dump.write(&self.state_path).await
    }
}

async fn ensure_parent(path: &Path) -> CliResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}
