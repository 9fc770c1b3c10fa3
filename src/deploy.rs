//! Resource deployment: placing files and binaries, identity checks,
//! backups, and safety-checked removal.
//!
//! Removal is the dangerous half. A previously managed resource is removed
//! only if its on-disk type still matches what was recorded at deployment
//! time, and a copy-mode target that looks edited since the last run is
//! left alone with a warning. The engine never silently destroys data it
//! cannot prove it owns.

use crate::schema::DeployMode;
use crate::state::ManagedFile;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Placement
// ============================================================================

/// Place a resource at its target, creating parent directories as needed.
///
/// Any pre-existing target must already have been resolved away by the
/// conflict protocol; this function fails rather than clobbers.
pub fn place(source: &Path, target: &Path, mode: DeployMode) -> Result<()> {
    if !source.exists() {
        bail!("source does not exist: {}", source.display());
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory: {}", parent.display()))?;
    }

    match mode {
        DeployMode::Link => {
            #[cfg(unix)]
            std::os::unix::fs::symlink(source, target).with_context(|| {
                format!(
                    "Failed to create symlink: {} -> {}",
                    target.display(),
                    source.display()
                )
            })?;

            #[cfg(not(unix))]
            bail!("link deployment is not supported on this platform");
        }
        DeployMode::Copy => {
            fs::copy(source, target).with_context(|| {
                format!(
                    "Failed to copy {} -> {}",
                    source.display(),
                    target.display()
                )
            })?;
        }
    }

    Ok(())
}

/// Remove whatever currently sits at the target, symlink or file.
pub fn remove_existing(target: &Path) -> Result<()> {
    fs::remove_file(target)
        .with_context(|| format!("Failed to remove existing target: {}", target.display()))
}

// ============================================================================
// Identity
// ============================================================================

/// Whether the target already is what the configuration asks for.
///
/// Link mode compares the link's destination against the source path;
/// copy mode compares content fingerprints. Identical resources are
/// skipped as no-ops, which also avoids pointless privilege escalation on
/// unchanged systems.
pub fn identical(target: &Path, source: &Path, mode: DeployMode) -> Result<bool> {
    match mode {
        DeployMode::Link => {
            if !target.is_symlink() {
                return Ok(false);
            }
            let link_target = fs::read_link(target).context("Failed to read symlink")?;

            let expected = source.canonicalize().unwrap_or_else(|_| source.to_path_buf());
            let actual = if link_target.is_absolute() {
                link_target.canonicalize().unwrap_or(link_target)
            } else {
                target
                    .parent()
                    .map(|p| p.join(&link_target))
                    .and_then(|p| p.canonicalize().ok())
                    .unwrap_or(link_target)
            };

            Ok(expected == actual)
        }
        DeployMode::Copy => {
            if target.is_symlink() || !target.is_file() {
                return Ok(false);
            }
            Ok(fingerprint(target)? == fingerprint(source)?)
        }
    }
}

/// blake3 content fingerprint of a file.
pub fn fingerprint(path: &Path) -> Result<String> {
    let content =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(blake3::hash(&content).to_hex().to_string())
}

// ============================================================================
// Backups
// ============================================================================

/// Timestamped backup path next to the target.
pub fn backup_path(target: &Path, now: DateTime<Utc>) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "resource".to_string());
    let backup_name = format!("{name}.bak.{}", now.format("%Y%m%d-%H%M%S"));
    target.with_file_name(backup_name)
}

/// Move the current target aside to a backup location.
pub fn back_up(target: &Path, backup: &Path) -> Result<()> {
    fs::rename(target, backup).with_context(|| {
        format!(
            "Failed to back up {} -> {}",
            target.display(),
            backup.display()
        )
    })
}

// ============================================================================
// Removal
// ============================================================================

/// Outcome of a safety-checked removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The resource was removed
    Removed,
    /// Nothing at the target; nothing to do
    Missing,
    /// On-disk type no longer matches the recorded deployment kind
    TypeMismatch,
    /// Copy-mode target looks edited since the last run
    PossiblyModified,
}

/// Remove a previously managed resource, refusing anything suspicious.
///
/// `last_applied` is the timestamp of the state file the entry came from;
/// a copy-mode target with a newer mtime was plausibly edited by the user
/// after deployment and is left in place.
pub fn remove_managed(entry: &ManagedFile, last_applied: DateTime<Utc>) -> Result<RemoveOutcome> {
    let target = Path::new(&entry.target);

    if !target.exists() && !target.is_symlink() {
        return Ok(RemoveOutcome::Missing);
    }

    match entry.mode {
        DeployMode::Link => {
            if !target.is_symlink() {
                log::warn!(
                    "not removing {}: recorded as a link but is not a symlink on disk",
                    target.display()
                );
                return Ok(RemoveOutcome::TypeMismatch);
            }
        }
        DeployMode::Copy => {
            if target.is_symlink() || !target.is_file() {
                log::warn!(
                    "not removing {}: recorded as a copy but is not a regular file on disk",
                    target.display()
                );
                return Ok(RemoveOutcome::TypeMismatch);
            }
            if possibly_modified(target, last_applied) {
                log::warn!(
                    "not removing {}: modified since the last converge run",
                    target.display()
                );
                return Ok(RemoveOutcome::PossiblyModified);
            }
        }
    }

    fs::remove_file(target)
        .with_context(|| format!("Failed to remove {}", target.display()))?;
    Ok(RemoveOutcome::Removed)
}

/// Conservative edit heuristic for copy-mode targets: an mtime newer than
/// the last state write, or an unreadable mtime, counts as modified.
fn possibly_modified(target: &Path, last_applied: DateTime<Utc>) -> bool {
    let modified = match fs::metadata(target).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(_) => return true,
    };
    DateTime::<Utc>::from(modified) > last_applied
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    // ── place ────────────────────────────────────────────────────────

    #[test]
    fn place_link_creates_symlink() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "source", "content");
        let target = tmp.path().join("nested/dir/link");

        place(&source, &target, DeployMode::Link).unwrap();
        assert!(target.is_symlink());
        assert_eq!(fs::read_link(&target).unwrap(), source);
    }

    #[test]
    fn place_copy_copies_content() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "source", "content");
        let target = tmp.path().join("copy");

        place(&source, &target, DeployMode::Copy).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "content");
        assert!(!target.is_symlink());
    }

    #[test]
    fn place_missing_source_errors() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("gone");
        let target = tmp.path().join("target");

        assert!(place(&source, &target, DeployMode::Copy).is_err());
    }

    // ── identical ────────────────────────────────────────────────────

    #[test]
    fn identical_link_pointing_at_source() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "source", "content");
        let target = tmp.path().join("link");
        place(&source, &target, DeployMode::Link).unwrap();

        assert!(identical(&target, &source, DeployMode::Link).unwrap());
    }

    #[test]
    fn identical_link_pointing_elsewhere() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "source", "content");
        let other = write_file(tmp.path(), "other", "other");
        let target = tmp.path().join("link");
        place(&other, &target, DeployMode::Link).unwrap();

        assert!(!identical(&target, &source, DeployMode::Link).unwrap());
    }

    #[test]
    fn identical_copy_same_content() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "source", "same");
        let target = write_file(tmp.path(), "target", "same");

        assert!(identical(&target, &source, DeployMode::Copy).unwrap());
    }

    #[test]
    fn identical_copy_different_content() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "source", "one");
        let target = write_file(tmp.path(), "target", "two");

        assert!(!identical(&target, &source, DeployMode::Copy).unwrap());
    }

    #[test]
    fn regular_file_is_not_identical_to_link_desire() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "source", "content");
        let target = write_file(tmp.path(), "target", "content");

        assert!(!identical(&target, &source, DeployMode::Link).unwrap());
    }

    // ── backups ──────────────────────────────────────────────────────

    #[test]
    fn backup_path_is_distinct_and_sibling() {
        let target = Path::new("/home/user/.bashrc");
        let backup = backup_path(target, Utc::now());

        assert_ne!(backup, target);
        assert_eq!(backup.parent(), target.parent());
        assert!(backup.file_name().unwrap().to_string_lossy().contains(".bak."));
    }

    #[test]
    fn back_up_preserves_content() {
        let tmp = TempDir::new().unwrap();
        let target = write_file(tmp.path(), "target", "precious");
        let backup = backup_path(&target, Utc::now());

        back_up(&target, &backup).unwrap();
        assert!(!target.exists());
        assert_eq!(fs::read_to_string(&backup).unwrap(), "precious");
    }

    // ── removal ──────────────────────────────────────────────────────

    fn managed(target: &Path, mode: DeployMode) -> ManagedFile {
        ManagedFile {
            name: "res".to_string(),
            target: target.display().to_string(),
            mode,
            backup: None,
        }
    }

    #[test]
    fn remove_managed_link() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "source", "content");
        let target = tmp.path().join("link");
        place(&source, &target, DeployMode::Link).unwrap();

        let outcome = remove_managed(&managed(&target, DeployMode::Link), Utc::now()).unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed);
        assert!(!target.exists() && !target.is_symlink());
    }

    #[test]
    fn remove_managed_missing_target() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("gone");

        let outcome = remove_managed(&managed(&target, DeployMode::Link), Utc::now()).unwrap();
        assert_eq!(outcome, RemoveOutcome::Missing);
    }

    #[test]
    fn remove_refuses_type_mismatch() {
        let tmp = TempDir::new().unwrap();
        // Recorded as a link, but a regular file sits there now
        let target = write_file(tmp.path(), "target", "user data");

        let outcome = remove_managed(&managed(&target, DeployMode::Link), Utc::now()).unwrap();
        assert_eq!(outcome, RemoveOutcome::TypeMismatch);
        assert!(target.exists());
    }

    #[test]
    fn remove_refuses_possibly_modified_copy() {
        let tmp = TempDir::new().unwrap();
        let target = write_file(tmp.path(), "target", "edited after deploy");

        // State written an hour before the file's mtime
        let last_applied = Utc::now() - Duration::hours(1);
        let outcome = remove_managed(&managed(&target, DeployMode::Copy), last_applied).unwrap();
        assert_eq!(outcome, RemoveOutcome::PossiblyModified);
        assert!(target.exists());
    }

    #[test]
    fn remove_untouched_copy() {
        let tmp = TempDir::new().unwrap();
        let target = write_file(tmp.path(), "target", "deployed content");

        // State written after the file's mtime: untouched since the run
        let last_applied = Utc::now() + Duration::hours(1);
        let outcome = remove_managed(&managed(&target, DeployMode::Copy), last_applied).unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed);
        assert!(!target.exists());
    }
}
