//! Unattended installer configuration (TOML).

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Installer configuration.
///
/// Missing fields default to the values an interactive client would use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UnattendedConfig {
    /// Pause between two download progress polls, in milliseconds.
    pub poll_interval_ms: u64,

    /// Service that remote scripts are fetched from (shown while waiting).
    pub site_url: String,

    /// Maximum nesting of dependency installs below the requested one.
    pub max_dependency_depth: u32,
}

impl Default for UnattendedConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            site_url: "https://lutris.net".to_string(),
            max_dependency_depth: 8,
        }
    }
}

impl UnattendedConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be > 0"));
        }
        if self.max_dependency_depth == 0 {
            return Err(anyhow!("max_dependency_depth must be > 0"));
        }
        if self.site_url.trim().is_empty() {
            return Err(anyhow!("site_url must be non-empty"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `UnattendedConfig::default()`.
pub fn load_config(path: &Path) -> Result<UnattendedConfig> {
    if !path.exists() {
        return Ok(UnattendedConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: UnattendedConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
