//! Resolution and probe caches.
//!
//! Two persisted caches live under the cache root:
//!
//! - `ResolvedCache`: a fingerprint cache for merged configuration models,
//!   keyed by a digest of the ordered source path list and validated
//!   against every source file's modification time. Known limitation:
//!   mtime comparison cannot distinguish a real edit from a touch with
//!   unchanged content, and has coarse resolution on some filesystems.
//! - `ProbeCache`: installed-package probe results with a fixed TTL.
//!   Installation status is external mutable state with no change
//!   notification available, so a staleness window is the only workable
//!   rule.
//!
//! Both caches degrade to a miss on any mismatch, missing file, or parse
//! failure - a cache problem must never fail a run, only slow it down.
//! Records are written to a temp file and renamed into place, so a
//! half-written record at worst fails to parse and reads as a miss.

use crate::merge::MachineConfig;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Staleness window for installed-package probe results.
pub const PROBE_TTL_SECS: i64 = 3600;

// ============================================================================
// Resolved-config cache
// ============================================================================

/// Fingerprint cache for merged configuration models.
pub struct ResolvedCache {
    root: PathBuf,
}

/// One persisted cache record.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    /// Digest of the ordered source path list (also the file key)
    config_hash: String,
    /// The ordered source paths the model was merged from
    source_paths: Vec<String>,
    /// Modification time per source path, nanoseconds since the epoch
    source_mtimes: BTreeMap<String, u128>,
    /// When the record was written
    cached_at: DateTime<Utc>,
    /// The merged model itself
    model: MachineConfig,
}

impl ResolvedCache {
    /// Create a cache rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Load a cached model for exactly this ordered path list.
    ///
    /// Returns `None` unless the stored path list is identical in content
    /// and order and every path's on-disk mtime matches the stored value
    /// bit-for-bit.
    pub fn load(&self, paths: &[PathBuf]) -> Option<MachineConfig> {
        let file = self.entry_file(paths);
        let content = fs::read_to_string(&file).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("cache record unparseable ({e}), treating as miss");
                return None;
            }
        };

        let requested: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        if entry.source_paths != requested {
            log::debug!("cache miss: source path list changed");
            return None;
        }

        for path in paths {
            let key = path.display().to_string();
            let stored = entry.source_mtimes.get(&key)?;
            let current = mtime_nanos(path)?;
            if *stored != current {
                log::debug!("cache miss: {} modified", path.display());
                return None;
            }
        }

        log::debug!("cache hit for {} source documents", paths.len());
        Some(entry.model)
    }

    /// Persist a model keyed by its ordered path list.
    ///
    /// Best-effort: a failure to persist is logged and swallowed, it only
    /// degrades future runs to a full resolution.
    pub fn store(&self, model: &MachineConfig, paths: &[PathBuf]) {
        let mut source_mtimes = BTreeMap::new();
        for path in paths {
            match mtime_nanos(path) {
                Some(nanos) => {
                    source_mtimes.insert(path.display().to_string(), nanos);
                }
                None => {
                    log::warn!("not caching: cannot stat {}", path.display());
                    return;
                }
            }
        }

        let entry = CacheEntry {
            config_hash: digest(paths),
            source_paths: paths.iter().map(|p| p.display().to_string()).collect(),
            source_mtimes,
            cached_at: Utc::now(),
            model: model.clone(),
        };

        if let Err(e) = self.write_entry(&entry, paths) {
            log::warn!("failed to persist resolved-config cache: {e:#}");
        }
    }

    fn write_entry(&self, entry: &CacheEntry, paths: &[PathBuf]) -> anyhow::Result<()> {
        fs::create_dir_all(&self.root)?;
        let file = self.entry_file(paths);
        let content = serde_json::to_string_pretty(entry)?;
        write_atomic(&file, &content)
    }

    fn entry_file(&self, paths: &[PathBuf]) -> PathBuf {
        self.root.join(format!("resolved-{}.json", digest(paths)))
    }
}

/// Opaque digest of an ordered source path list.
fn digest(paths: &[PathBuf]) -> String {
    let mut hasher = blake3::Hasher::new();
    for path in paths {
        hasher.update(path.display().to_string().as_bytes());
        hasher.update(b"\0");
    }
    hasher.finalize().to_hex()[..16].to_string()
}

fn mtime_nanos(path: &Path) -> Option<u128> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let nanos = modified
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .ok()?
        .as_nanos();
    Some(nanos)
}

/// Write content to a temp file, then rename into place. The old record
/// stays valid until the new one is fully committed.
fn write_atomic(file: &Path, content: &str) -> anyhow::Result<()> {
    let tmp = file.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, file)?;
    Ok(())
}

// ============================================================================
// Probe cache
// ============================================================================

/// TTL cache for installed-package probe results, one record per manager.
pub struct ProbeCache {
    root: PathBuf,
    ttl: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProbeEntry {
    manager: String,
    installed: Vec<String>,
    cached_at: DateTime<Utc>,
}

impl ProbeCache {
    /// Create a probe cache with the default TTL.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ttl: Duration::seconds(PROBE_TTL_SECS),
        }
    }

    /// Create a probe cache with a custom TTL (tests).
    pub fn with_ttl(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl,
        }
    }

    /// Load a fresh-enough probe result for a manager.
    pub fn load(&self, manager: &str) -> Option<Vec<String>> {
        let content = fs::read_to_string(self.entry_file(manager)).ok()?;
        let entry: ProbeEntry = serde_json::from_str(&content).ok()?;

        if entry.manager != manager {
            return None;
        }
        if Utc::now() - entry.cached_at > self.ttl {
            log::debug!("probe cache for {manager} is stale");
            return None;
        }
        Some(entry.installed)
    }

    /// Persist a probe result. Best-effort, like the resolved cache.
    pub fn store(&self, manager: &str, installed: &[String]) {
        let entry = ProbeEntry {
            manager: manager.to_string(),
            installed: installed.to_vec(),
            cached_at: Utc::now(),
        };

        let result = fs::create_dir_all(&self.root)
            .map_err(anyhow::Error::from)
            .and_then(|()| {
                let content = serde_json::to_string_pretty(&entry)?;
                write_atomic(&self.entry_file(manager), &content)
            });

        if let Err(e) = result {
            log::warn!("failed to persist probe cache for {manager}: {e:#}");
        }
    }

    /// Drop a manager's probe record, forcing a live probe next run.
    pub fn invalidate(&self, manager: &str) {
        let _ = fs::remove_file(self.entry_file(manager));
    }

    fn entry_file(&self, manager: &str) -> PathBuf {
        self.root.join(format!("probe-{manager}.json"))
    }
}

/// Remove every cache record under the root (both cache kinds).
pub fn clear(root: &Path) -> anyhow::Result<usize> {
    let mut removed = 0;
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(_) => return Ok(0),
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if (name.starts_with("resolved-") || name.starts_with("probe-")) && name.ends_with(".json")
        {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

// ============================================================================
// Tests
// ============================================================================
