//! Loads the demonstration harness's TOML configuration file.

use anyhow::{Context, Result};
use fsmonitor_core::config::RawConfig;
use std::path::Path;

/// Read `path` if given, otherwise fall back to a disabled default so the
/// harness still runs (and simply does nothing) without a config file.
pub fn load_config(path: Option<&Path>) -> Result<RawConfig> {
    let Some(path) = path else {
        return Ok(RawConfig { mode: None, hook_path: None, hook_version: None });
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading fsmonitor config at {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing fsmonitor config at {}", path.display()))
}
