//! Folding an ordered document set into one logical model.
//!
//! Merge policy differs by field kind, and the asymmetry is deliberate:
//! package lists are additive across included documents (a "base" include
//! contributes packages that a "desktop" include extends), while a scalar
//! or keyed entry declared twice must not silently duplicate - the later
//! writer wins. "Later" follows include order, with the root document's own
//! top-level fields applied after all includes, so the root always
//! overrides what it pulls in.

use crate::schema::{BinaryEntry, ConfigDocument, DocumentBody, FileEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The merged configuration model consumed by the convergence engine.
///
/// Owned by a single resolution and immutable once produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Config schema version
    pub schema: u32,
    /// Desired packages per manager
    pub packages: crate::schema::PackagesSection,
    /// Desired files, keyed by resource name
    pub files: BTreeMap<String, FileEntry>,
    /// Desired binaries, keyed by resource name
    pub binaries: BTreeMap<String, BinaryEntry>,
    /// Desired dconf settings, keyed by full key path
    pub dconf: BTreeMap<String, String>,
    /// Effective run policy
    pub policy: Policy,
}

/// Effective policy after merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Back up conflicting destinations instead of overwriting in place
    pub backup: bool,
    /// Prompt on conflicts when a terminal is attached
    pub interactive: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            backup: true,
            interactive: true,
        }
    }
}

/// Fold an ordered document set (root first, as produced by
/// `include::resolve`) into a single model.
///
/// Pure function: no IO, no failure mode of its own.
pub fn merge(documents: &[ConfigDocument]) -> MachineConfig {
    let mut config = MachineConfig {
        schema: 1,
        ..Default::default()
    };

    // Includes fold first in resolution order; the root folds last so its
    // scalar and keyed-map fields override everything it includes.
    for doc in documents.iter().skip(1).chain(documents.first()) {
        apply(&mut config, &doc.body);
    }

    config
}

fn apply(config: &mut MachineConfig, body: &DocumentBody) {
    // Scalars: last writer wins
    if let Some(schema) = body.schema {
        config.schema = schema;
    }
    if let Some(backup) = body.policy.backup {
        config.policy.backup = backup;
    }
    if let Some(interactive) = body.policy.interactive {
        config.policy.interactive = interactive;
    }

    // Package lists: concatenated; per-manager flags: last writer wins
    for (dst, src) in [
        (&mut config.packages.apt, &body.packages.apt),
        (&mut config.packages.snap, &body.packages.snap),
        (&mut config.packages.flatpak, &body.packages.flatpak),
    ] {
        dst.install.extend(src.install.iter().cloned());
        if src.flags.is_some() {
            dst.flags = src.flags.clone();
        }
    }

    // Keyed maps: union, last writer wins per key
    for (name, entry) in &body.files {
        config.files.insert(name.clone(), entry.clone());
    }
    for (name, entry) in &body.binaries {
        config.binaries.insert(name.clone(), entry.clone());
    }
    for (key, value) in &body.dconf {
        config.dconf.insert(key.clone(), value.clone());
    }
}

// ============================================================================
// Tests
// ============================================================================
