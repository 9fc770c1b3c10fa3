//! Centralized path resolution for converge.
//!
//! This module provides platform-aware path resolution with environment
//! variable support, making it easy to point converge at an alternate
//! configuration tree (or at isolated temporary roots in tests).
//!
//! # Environment Variables
//!
//! - `CONVERGE_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/converge`)
//! - `CONVERGE_STATE_DIR` - Override state directory
//! - `CONVERGE_CACHE_DIR` - Override cache directory
//!
//! # Path Resolution Priority
//!
//! For each directory:
//! 1. The `CONVERGE_*` environment variable
//! 2. The matching `XDG_*_HOME` variable (if set)
//! 3. Unix default: `~/.config/converge`, `~/.local/state/converge`,
//!    `~/.cache/converge`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "CONVERGE_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "CONVERGE_STATE_DIR";

/// Environment variable for cache directory override
pub const ENV_CACHE_DIR: &str = "CONVERGE_CACHE_DIR";

/// Get the converge config directory path
pub fn config_dir() -> Result<PathBuf> {
    resolve_dir(ENV_CONFIG_DIR, "XDG_CONFIG_HOME", &[".config"])
}

/// Get the converge state directory path
pub fn state_dir() -> Result<PathBuf> {
    resolve_dir(ENV_STATE_DIR, "XDG_STATE_HOME", &[".local", "state"])
}

/// Get the converge cache directory path
pub fn cache_dir() -> Result<PathBuf> {
    resolve_dir(ENV_CACHE_DIR, "XDG_CACHE_HOME", &[".cache"])
}

fn resolve_dir(env_var: &str, xdg_var: &str, home_segments: &[&str]) -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Ok(dir) = std::env::var(env_var) {
        let path = expand(&dir);
        log::debug!("Using dir from {}: {}", env_var, path.display());
        return Ok(path);
    }

    // 2. Check XDG variable
    if let Ok(xdg) = std::env::var(xdg_var) {
        let path = PathBuf::from(xdg).join("converge");
        log::debug!("Using {}: {}", xdg_var, path.display());
        return Ok(path);
    }

    // 3. Unix default under the home directory
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let mut path = home;
    for segment in home_segments {
        path.push(segment);
    }
    path.push("converge");
    log::debug!("Using default dir: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
///
/// This is the canonical path expansion function for converge. All modules
/// should use this instead of calling shellexpand directly.
///
/// # Examples
///
/// ```
/// use converge::paths;
///
/// // Expands ~ to home directory
/// let home_path = paths::expand("~/dotfiles");
///
/// // Expands environment variables
/// let var_path = paths::expand("$HOME/dotfiles");
/// ```
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
