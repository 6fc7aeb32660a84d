//! Reading installer scripts from disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::script::InstallScript;

/// Load and parse a YAML (or JSON) installer script.
pub fn load_script(path: &Path) -> Result<InstallScript> {
    debug!(path = %path.display(), "loading install script");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read script {}", path.display()))?;
    parse_script(&contents).with_context(|| format!("parse script {}", path.display()))
}

pub fn parse_script(contents: &str) -> Result<InstallScript> {
    let script = serde_yaml::from_str(contents)?;
    Ok(script)
}
