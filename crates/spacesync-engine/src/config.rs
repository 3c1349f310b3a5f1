//! Engine configuration.
//!
//! Loaded from a TOML file; every key is optional and falls back to its
//! default. A few keys can also be overridden from the environment.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spacesync_core::limits::OVERWRITE_CAP;
use spacesync_core::{Result, SyncError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How often the reporter flushes pending notes
    pub flush_interval_ms: u64,
    /// Lines kept on the status board
    pub note_line_cap: usize,
    /// How long a preview waits for the operator
    pub confirmation_timeout_secs: u64,
    /// Overwrite entries allowed on one entity, at most the platform ceiling
    pub overwrite_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 2000,
            note_line_cap: 15,
            confirmation_timeout_secs: 60,
            overwrite_cap: OVERWRITE_CAP,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SyncError::Serialization {
            message: format!("engine config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; a missing file yields the defaults
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(SyncError::configuration(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Apply `SPACESYNC_FLUSH_INTERVAL_MS` and
    /// `SPACESYNC_CONFIRMATION_TIMEOUT_SECS` when set
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(value) = env_number("SPACESYNC_FLUSH_INTERVAL_MS")? {
            self.flush_interval_ms = value;
        }
        if let Some(value) = env_number("SPACESYNC_CONFIRMATION_TIMEOUT_SECS")? {
            self.confirmation_timeout_secs = value;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.flush_interval_ms == 0 {
            return Err(SyncError::configuration("flush_interval_ms must be positive"));
        }
        if self.note_line_cap == 0 {
            return Err(SyncError::configuration("note_line_cap must be positive"));
        }
        if self.confirmation_timeout_secs == 0 {
            return Err(SyncError::configuration(
                "confirmation_timeout_secs must be positive",
            ));
        }
        if self.overwrite_cap == 0 || self.overwrite_cap > OVERWRITE_CAP {
            return Err(SyncError::configuration(format!(
                "overwrite_cap must be between 1 and {}",
                OVERWRITE_CAP
            )));
        }
        Ok(())
    }
}

fn env_number(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SyncError::configuration(format!("{} is not a number: {}", name, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = EngineConfig::from_toml_str("flush_interval_ms = 500\n").unwrap();
        assert_eq!(config.flush_interval(), Duration::from_millis(500));
        assert_eq!(config.note_line_cap, 15);
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(60));
        assert_eq!(config.overwrite_cap, 100);
    }

    #[test]
    fn test_cap_above_platform_ceiling_rejected() {
        let err = EngineConfig::from_toml_str("overwrite_cap = 250\n").unwrap_err();
        assert!(matches!(err, SyncError::Configuration { .. }));
    }

    #[test]
    fn test_malformed_toml_is_serialization_error() {
        let err = EngineConfig::from_toml_str("flush_interval_ms = \"soon\"\n").unwrap_err();
        assert!(matches!(err, SyncError::Serialization { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("engine.toml"))
            .await
            .unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
