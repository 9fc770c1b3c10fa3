//! Command handlers for the converge CLI.

pub mod apply;
pub mod cache;
pub mod plan;
pub mod status;

use crate::paths;
use crate::schema::DEFAULT_FILE_NAME;
use anyhow::{Result, bail};
use std::path::PathBuf;

/// Locate the root configuration document.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let path = match explicit {
        Some(path) => path,
        None => paths::config_dir()?.join(DEFAULT_FILE_NAME),
    };

    if !path.exists() {
        bail!(
            "No configuration found at {}.\n\
             Create it, or point at one with --config.",
            path.display()
        );
    }
    Ok(path)
}
