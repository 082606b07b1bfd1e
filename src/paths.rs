//! Path resolution for driftwatch
//!
//! # Environment Variables
//!
//! - `DRIFTWATCH_CONFIG` - Override the settings file location
//!
//! # Settings File Resolution Priority
//!
//! 1. `--config` flag
//! 2. `DRIFTWATCH_CONFIG` environment variable
//! 3. `XDG_CONFIG_HOME/driftwatch/config.toml` (if set)
//! 4. `~/.config/driftwatch/config.toml`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for settings file override
pub const ENV_CONFIG: &str = "DRIFTWATCH_CONFIG";

/// Settings file name inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Where the settings file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    Flag,
    Env,
    Default,
}

impl std::fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigOrigin::Flag => write!(f, "--config"),
            ConfigOrigin::Env => write!(f, "{ENV_CONFIG}"),
            ConfigOrigin::Default => write!(f, "default location"),
        }
    }
}

/// Resolve the settings file path from the process environment.
pub fn config_file(flag: Option<&Path>) -> Result<(PathBuf, ConfigOrigin)> {
    config_file_with(flag, |key| std::env::var(key).ok())
}

/// Resolve the settings file path with an explicit environment lookup.
pub fn config_file_with(
    flag: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(PathBuf, ConfigOrigin)> {
    if let Some(path) = flag {
        return Ok((expand(&path.to_string_lossy()), ConfigOrigin::Flag));
    }

    if let Some(path) = env(ENV_CONFIG).filter(|p| !p.is_empty()) {
        let path = expand(&path);
        log::debug!("Using settings file from {}: {}", ENV_CONFIG, path.display());
        return Ok((path, ConfigOrigin::Env));
    }

    if let Some(xdg_config) = env("XDG_CONFIG_HOME").filter(|p| !p.is_empty()) {
        let path = PathBuf::from(xdg_config).join("driftwatch").join(CONFIG_FILE);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok((path, ConfigOrigin::Default));
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok((
        home.join(".config").join("driftwatch").join(CONFIG_FILE),
        ConfigOrigin::Default,
    ))
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables leave the string unchanged.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
