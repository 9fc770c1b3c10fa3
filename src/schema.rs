//! Configuration document schema.
//!
//! A configuration tree is a set of TOML documents linked by `[[include]]`
//! directives. This module defines the on-disk shape of one document and
//! loads it into memory; expansion of the include graph lives in
//! `crate::include` and folding into a single model in `crate::merge`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Conventional file name looked up when an include points at a directory.
pub const DEFAULT_FILE_NAME: &str = "converge.toml";

/// Conventional extension tried when an include path has none.
pub const DEFAULT_EXTENSION: &str = "toml";

// ============================================================================
// Document
// ============================================================================

/// One configuration document, loaded from disk.
#[derive(Debug)]
pub struct ConfigDocument {
    /// Absolute path this document was loaded from
    pub path: PathBuf,
    /// The document's own directory; relative include targets resolve
    /// against this, not against the root document's directory
    pub dir: PathBuf,
    /// Deserialized contents
    pub body: DocumentBody,
}

impl ConfigDocument {
    /// Load a document from an absolute path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config document: {}", path.display()))?;

        let body: DocumentBody = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in config document: {}", path.display()))?;

        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        Ok(Self {
            path: path.to_path_buf(),
            dir,
            body,
        })
    }
}

/// Deserialized contents of one document.
///
/// Every section is optional; a document contributing only packages, or
/// only includes, is common in practice.
#[derive(Debug, Deserialize, Default)]
pub struct DocumentBody {
    /// Config schema version (scalar, last writer wins)
    #[serde(default)]
    pub schema: Option<u32>,

    /// Include directives, processed in declaration order
    #[serde(default, rename = "include")]
    pub includes: Vec<IncludeDirective>,

    /// Package declarations per manager
    #[serde(default)]
    pub packages: PackagesSection,

    /// Files to deploy, keyed by resource name
    #[serde(default)]
    pub files: BTreeMap<String, FileEntry>,

    /// Binaries to deploy, keyed by resource name
    #[serde(default)]
    pub binaries: BTreeMap<String, BinaryEntry>,

    /// dconf settings, keyed by full key path (e.g. "/org/gnome/...")
    #[serde(default)]
    pub dconf: BTreeMap<String, String>,

    /// Run policy knobs
    #[serde(default)]
    pub policy: PolicySection,
}

// ============================================================================
// Includes
// ============================================================================

/// One `[[include]]` directive.
///
/// Exactly one of `path` or `glob` must be set; the resolver rejects
/// directives with both or neither.
#[derive(Debug, Clone, Deserialize)]
pub struct IncludeDirective {
    /// Concrete target: absolute, or relative to the declaring document
    #[serde(default)]
    pub path: Option<String>,

    /// Glob pattern: wildcards allowed in the final path component only
    #[serde(default)]
    pub glob: Option<String>,

    /// Missing targets (or empty glob matches) are skipped silently
    #[serde(default)]
    pub optional: bool,

    /// Conditions that must all hold for the directive to apply
    #[serde(default, rename = "when")]
    pub conditions: Vec<IncludeCondition>,
}

/// An equality predicate gating an include directive.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncludeCondition {
    /// `{ os = "linux" }` - current OS name equals the value
    Os {
        /// Expected `std::env::consts::OS` value
        os: String,
    },
    /// `{ env = "NAME", equals = "value" }` - environment variable equals the value
    Env {
        /// Variable name
        env: String,
        /// Expected value
        equals: String,
    },
}

impl IncludeCondition {
    /// Evaluate the predicate against the current process environment.
    pub fn is_met(&self) -> bool {
        match self {
            IncludeCondition::Os { os } => std::env::consts::OS == os,
            IncludeCondition::Env { env, equals } => {
                std::env::var(env).map(|v| v == *equals).unwrap_or(false)
            }
        }
    }
}

// ============================================================================
// Packages
// ============================================================================

/// Package declarations for all supported managers.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PackagesSection {
    /// apt packages
    #[serde(default)]
    pub apt: ManagerSection,
    /// snap packages
    #[serde(default)]
    pub snap: ManagerSection,
    /// flatpak applications
    #[serde(default)]
    pub flatpak: ManagerSection,
}

/// Declarations for one package manager.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ManagerSection {
    /// Packages to install. Lists from multiple documents concatenate;
    /// duplicates are permitted here and deduplicated at plan time.
    #[serde(default)]
    pub install: Vec<String>,

    /// Default flags passed to every install for this manager.
    /// Last document to set this wins.
    #[serde(default)]
    pub flags: Option<Vec<String>>,
}

// ============================================================================
// Files and binaries
// ============================================================================

/// How a resource is placed at its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    /// Symlink from target to source
    Link,
    /// Copy source contents to target
    Copy,
}

/// A file to deploy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FileEntry {
    /// Source path (supports ~ and env vars)
    pub source: String,
    /// Destination path (supports ~ and env vars)
    pub target: String,
    /// Deployment mode, defaults to link
    #[serde(default = "default_file_mode")]
    pub mode: DeployMode,
}

/// A binary to deploy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BinaryEntry {
    /// Source path (supports ~ and env vars)
    pub source: String,
    /// Destination path; defaults to `~/.local/bin/<name>`
    #[serde(default)]
    pub target: Option<String>,
    /// Deployment mode, defaults to copy
    #[serde(default = "default_binary_mode")]
    pub mode: DeployMode,
}

fn default_file_mode() -> DeployMode {
    DeployMode::Link
}

fn default_binary_mode() -> DeployMode {
    DeployMode::Copy
}

// ============================================================================
// Policy
// ============================================================================

/// Per-document policy knobs. Fields are optional so the merger can tell
/// "not set here" from an explicit value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicySection {
    /// Back up conflicting destinations instead of overwriting in place
    #[serde(default)]
    pub backup: Option<bool>,

    /// Prompt on conflicts when a terminal is attached
    #[serde(default)]
    pub interactive: Option<bool>,
}

// ============================================================================
// Tests
// ============================================================================
