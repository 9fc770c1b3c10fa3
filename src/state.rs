//! Applied-state store.
//!
//! The durable record of what the engine installed or deployed on its last
//! successful run. It is the only cross-run persistent entity and the sole
//! source of truth for "this engine manages it", which makes it the basis
//! for removal decisions: a resource the state file never mentions is
//! never removed.
//!
//! The file is rewritten wholesale at the end of a successful run (build
//! the full new state, then persist via temp-file + rename), and a missing
//! or unreadable file degrades to the empty state so a first run on a
//! fresh machine installs everything and removes nothing.

use crate::schema::DeployMode;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Current state file format version.
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State structures
// ============================================================================

/// Everything the engine recorded after its last successful run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppliedState {
    /// State file format version
    pub version: u32,

    /// When the state was last written
    pub last_updated: DateTime<Utc>,

    /// Packages the engine manages, per manager
    #[serde(default)]
    pub packages: AppliedPackages,

    /// Files the engine deployed
    #[serde(default)]
    pub files: Vec<ManagedFile>,

    /// Binaries the engine deployed
    #[serde(default)]
    pub binaries: Vec<ManagedFile>,
}

/// Managed package names per manager.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AppliedPackages {
    /// apt packages
    #[serde(default)]
    pub apt: Vec<String>,
    /// snap packages
    #[serde(default)]
    pub snap: Vec<String>,
    /// flatpak applications
    #[serde(default)]
    pub flatpak: Vec<String>,
}

impl AppliedPackages {
    /// The managed name list for a manager.
    pub fn for_manager(&self, manager: pkgkit::Manager) -> &[String] {
        match manager {
            pkgkit::Manager::Apt => &self.apt,
            pkgkit::Manager::Snap => &self.snap,
            pkgkit::Manager::Flatpak => &self.flatpak,
        }
    }

    /// Mutable access to the managed name list for a manager.
    pub fn for_manager_mut(&mut self, manager: pkgkit::Manager) -> &mut Vec<String> {
        match manager {
            pkgkit::Manager::Apt => &mut self.apt,
            pkgkit::Manager::Snap => &mut self.snap,
            pkgkit::Manager::Flatpak => &mut self.flatpak,
        }
    }
}

/// One deployed file or binary.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ManagedFile {
    /// Resource name (the key in the configuration map)
    pub name: String,

    /// Expanded destination path
    pub target: String,

    /// How the resource was placed
    pub mode: DeployMode,

    /// Where the previous destination content was backed up, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

impl Default for AppliedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            packages: AppliedPackages::default(),
            files: Vec::new(),
            binaries: Vec::new(),
        }
    }
}

// ============================================================================
// Store
// ============================================================================

/// Loads and persists the applied state under an injected root directory.
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn state_file(&self) -> PathBuf {
        self.root.join("state.toml")
    }

    /// Load the applied state, degrading to the empty state on absence or
    /// parse failure. A load problem must never fail the run: treating it
    /// as "nothing previously managed" means nothing gets removed.
    pub fn load(&self) -> AppliedState {
        let path = self.state_file();

        if !path.exists() {
            log::debug!("state file does not exist, using empty state");
            return AppliedState::default();
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("failed to read state file {}: {e}", path.display());
                return AppliedState::default();
            }
        };

        match toml::from_str(&content) {
            Ok(state) => {
                log::debug!("loaded state from {}", path.display());
                state
            }
            Err(e) => {
                log::warn!("failed to parse state file {}: {e}", path.display());
                AppliedState::default()
            }
        }
    }

    /// Persist the full state atomically.
    pub fn save(&self, state: &AppliedState) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create state directory: {}", self.root.display()))?;

        let path = self.state_file();
        let content = toml::to_string_pretty(state).context("Failed to serialize state to TOML")?;

        // Rename-after-write: the old state stays valid until the new one
        // is fully committed.
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, &content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to commit state file: {}", path.display()))?;

        log::debug!("saved state to {}", path.display());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
