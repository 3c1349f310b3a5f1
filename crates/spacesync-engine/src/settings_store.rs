//! Per-home-space settings persistence.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spacesync_core::model::PlatformId;
use spacesync_core::{Result, SyncError, SyncSettings};
use tokio::sync::{Mutex, RwLock};

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Settings of `home`, or the defaults if none were saved
    async fn load(&self, home: PlatformId) -> Result<SyncSettings>;

    async fn save(&self, home: PlatformId, settings: &SyncSettings) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    spaces: RwLock<HashMap<PlatformId, SyncSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self, home: PlatformId) -> Result<SyncSettings> {
        Ok(self
            .spaces
            .read()
            .await
            .get(&home)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, home: PlatformId, settings: &SyncSettings) -> Result<()> {
        self.spaces.write().await.insert(home, settings.clone());
        Ok(())
    }
}

/// On-disk layout: one `[spaces."<home id>"]` table per home space
#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    spaces: BTreeMap<String, SyncSettings>,
}

/// Settings kept in one TOML file, rewritten whole on every save
#[derive(Debug)]
pub struct TomlSettingsStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn read_file(&self) -> Result<SettingsFile> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SettingsFile::default())
            }
            Err(e) => {
                return Err(SyncError::Settings {
                    message: format!("cannot read {}: {}", self.path.display(), e),
                })
            }
        };
        toml::from_str(&text).map_err(|e| SyncError::Serialization {
            message: format!("{}: {}", self.path.display(), e),
        })
    }

    async fn write_file(&self, file: &SettingsFile) -> Result<()> {
        let text = toml::to_string_pretty(file).map_err(|e| SyncError::Serialization {
            message: e.to_string(),
        })?;
        let tmp_path = self.path.with_extension("toml.tmp");
        tokio::fs::write(&tmp_path, text)
            .await
            .map_err(|e| SyncError::Settings {
                message: format!("cannot write {}: {}", tmp_path.display(), e),
            })?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(SyncError::Settings {
                message: format!("cannot replace {}: {}", self.path.display(), e),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for TomlSettingsStore {
    async fn load(&self, home: PlatformId) -> Result<SyncSettings> {
        let file = self.read_file().await?;
        Ok(file
            .spaces
            .get(&home.to_string())
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, home: PlatformId, settings: &SyncSettings) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read_file().await?;
        file.spaces.insert(home.to_string(), settings.clone());
        self.write_file(&file).await?;
        tracing::debug!(
            op = "settings_save",
            space_id = home.0,
            path = %self.path.display(),
            "settings saved"
        );
        Ok(())
    }
}
