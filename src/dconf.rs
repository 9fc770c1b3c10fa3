//! Thin dconf adapter.
//!
//! Wraps `dconf read` / `dconf write`. Writes are idempotent (the current
//! value is read first), so settings are apply-only and never tracked in
//! the applied state.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::process::Command;

/// Per-run summary of dconf writes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DconfSummary {
    /// Keys written because their value differed
    pub changed: usize,
    /// Keys already holding the desired value
    pub unchanged: usize,
    /// Keys that could not be read or written
    pub failed: usize,
}

/// Whether the dconf CLI is present.
pub fn is_available() -> bool {
    Command::new("dconf")
        .arg("help")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Read the current value of a key, `None` if unset.
pub fn read(key: &str) -> Result<Option<String>> {
    let output = Command::new("dconf")
        .args(["read", key])
        .output()
        .context("Failed to execute dconf")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("dconf read failed for {key}: {}", stderr.trim());
    }

    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

/// Write a value (GVariant text format, taken verbatim from config).
pub fn write(key: &str, value: &str) -> Result<()> {
    let output = Command::new("dconf")
        .args(["write", key, value])
        .output()
        .context("Failed to execute dconf")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("dconf write failed for {key}: {}", stderr.trim());
    }
    Ok(())
}

/// Apply a settings map. Per-key failures are logged and counted, never
/// fatal; a desktop-less machine simply reports everything as failed.
pub fn apply(settings: &BTreeMap<String, String>, dry_run: bool) -> DconfSummary {
    let mut summary = DconfSummary::default();

    for (key, desired) in settings {
        match read(key) {
            Ok(current) if current.as_deref() == Some(desired.as_str()) => {
                summary.unchanged += 1;
            }
            Ok(_) => {
                if dry_run {
                    summary.changed += 1;
                    continue;
                }
                match write(key, desired) {
                    Ok(()) => summary.changed += 1,
                    Err(e) => {
                        log::warn!("{e:#}");
                        summary.failed += 1;
                    }
                }
            }
            Err(e) => {
                log::warn!("{e:#}");
                summary.failed += 1;
            }
        }
    }

    summary
}
