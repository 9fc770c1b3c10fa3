//! Desired-vs-applied reconciliation.
//!
//! Produces the per-kind change sets for one run. The design is
//! deliberately asymmetric:
//!
//! - Package installs are `desired - applied` and the backend re-checks
//!   live installation status before acting, because "already installed"
//!   needs a system probe - the applied state only reflects this engine's
//!   last run, not manual changes.
//! - Removals come purely from the diff, because the persisted applied
//!   state is the only source of truth for "this engine manages it".
//! - Files and binaries are always handed to the deployer, which performs
//!   the idempotence check itself.
//!
//! Reconciliation never fails on its own; a missing applied state is the
//! empty state.

use crate::merge::MachineConfig;
use crate::state::{AppliedState, ManagedFile};
use pkgkit::Manager;
use std::collections::{BTreeMap, BTreeSet};

/// Default destination directory for binaries without an explicit target.
pub const DEFAULT_BIN_DIR: &str = "~/.local/bin";

// ============================================================================
// Plan types
// ============================================================================

/// The per-run change summary consumed by the apply path and the
/// presentation layer.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Package changes per manager
    pub packages: BTreeMap<Manager, PackagePlan>,
    /// File changes
    pub files: DeployPlan,
    /// Binary changes
    pub binaries: DeployPlan,
    /// Desired dconf settings (applied idempotently every run)
    pub dconf: BTreeMap<String, String>,
}

/// Install/remove sets for one package manager.
#[derive(Debug, Clone, Default)]
pub struct PackagePlan {
    /// Desired names not recorded as applied; the backend still re-probes
    /// live status before installing any of them
    pub to_install: Vec<String>,
    /// Previously applied names no longer desired
    pub to_remove: Vec<String>,
}

/// Deploy/remove sets for files or binaries.
#[derive(Debug, Clone, Default)]
pub struct DeployPlan {
    /// Every desired entry; the deployer no-ops the ones already correct
    pub to_deploy: Vec<DeployItem>,
    /// Previously managed entries absent from the desired map
    pub to_remove: Vec<ManagedFile>,
}

/// One resource to hand to the deployer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployItem {
    /// Resource name (configuration map key)
    pub name: String,
    /// Unexpanded source path as configured
    pub source: String,
    /// Unexpanded target path (binaries get the conventional default)
    pub target: String,
    /// Deployment mode
    pub mode: crate::schema::DeployMode,
}

impl Plan {
    /// Whether the plan contains any package change or removal. File and
    /// binary deploys are excluded: they run every time and usually no-op.
    pub fn has_package_changes(&self) -> bool {
        self.packages
            .values()
            .any(|p| !p.to_install.is_empty() || !p.to_remove.is_empty())
    }

    /// Total number of resources the apply pass will touch or verify.
    pub fn total_resources(&self) -> usize {
        let packages: usize = self
            .packages
            .values()
            .map(|p| p.to_install.len() + p.to_remove.len())
            .sum();
        packages
            + self.files.to_deploy.len()
            + self.files.to_remove.len()
            + self.binaries.to_deploy.len()
            + self.binaries.to_remove.len()
            + self.dconf.len()
    }
}

// ============================================================================
// Diff
// ============================================================================

/// Compute the change sets for one run.
pub fn plan(desired: &MachineConfig, applied: &AppliedState) -> Plan {
    let mut result = Plan {
        dconf: desired.dconf.clone(),
        ..Default::default()
    };

    for manager in Manager::ALL {
        let section = match manager {
            Manager::Apt => &desired.packages.apt,
            Manager::Snap => &desired.packages.snap,
            Manager::Flatpak => &desired.packages.flatpak,
        };
        let applied_names = applied.packages.for_manager(manager);
        result
            .packages
            .insert(manager, package_plan(&section.install, applied_names));
    }

    result.files = deploy_plan(
        desired
            .files
            .iter()
            .map(|(name, entry)| DeployItem {
                name: name.clone(),
                source: entry.source.clone(),
                target: entry.target.clone(),
                mode: entry.mode,
            })
            .collect(),
        &applied.files,
        &desired.files.keys().cloned().collect(),
    );

    result.binaries = deploy_plan(
        desired
            .binaries
            .iter()
            .map(|(name, entry)| DeployItem {
                name: name.clone(),
                source: entry.source.clone(),
                target: entry
                    .target
                    .clone()
                    .unwrap_or_else(|| format!("{DEFAULT_BIN_DIR}/{name}")),
                mode: entry.mode,
            })
            .collect(),
        &applied.binaries,
        &desired.binaries.keys().cloned().collect(),
    );

    result
}

fn package_plan(desired: &[String], applied: &[String]) -> PackagePlan {
    let applied_set: BTreeSet<&str> = applied.iter().map(String::as_str).collect();

    // Dedup while preserving first-occurrence order; merged lists may
    // contain duplicates by design.
    let mut seen = BTreeSet::new();
    let to_install = desired
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .filter(|name| !applied_set.contains(name.as_str()))
        .cloned()
        .collect();

    let desired_set: BTreeSet<&str> = desired.iter().map(String::as_str).collect();
    let to_remove = applied
        .iter()
        .filter(|name| !desired_set.contains(name.as_str()))
        .cloned()
        .collect();

    PackagePlan {
        to_install,
        to_remove,
    }
}

fn deploy_plan(
    to_deploy: Vec<DeployItem>,
    applied: &[ManagedFile],
    desired_names: &BTreeSet<String>,
) -> DeployPlan {
    let to_remove = applied
        .iter()
        .filter(|managed| !desired_names.contains(&managed.name))
        .cloned()
        .collect();

    DeployPlan {
        to_deploy,
        to_remove,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DeployMode, FileEntry};

    fn desired_with_apt(names: &[&str]) -> MachineConfig {
        let mut config = MachineConfig::default();
        config.packages.apt.install = names.iter().map(|s| s.to_string()).collect();
        config
    }

    fn applied_with_apt(names: &[&str]) -> AppliedState {
        let mut state = AppliedState::default();
        state.packages.apt = names.iter().map(|s| s.to_string()).collect();
        state
    }

    #[test]
    fn package_set_algebra() {
        let desired = desired_with_apt(&["a", "b", "c"]);
        let applied = applied_with_apt(&["b", "c", "d"]);

        let plan = plan(&desired, &applied);
        let apt = &plan.packages[&Manager::Apt];

        // Desired minus applied; live-installed filtering happens later,
        // at the backend probe
        assert_eq!(apt.to_install, vec!["a"]);
        // Applied minus desired
        assert_eq!(apt.to_remove, vec!["d"]);
    }

    #[test]
    fn duplicate_desired_packages_install_once() {
        let desired = desired_with_apt(&["git", "git", "vim"]);
        let applied = AppliedState::default();

        let plan = plan(&desired, &applied);
        assert_eq!(plan.packages[&Manager::Apt].to_install, vec!["git", "vim"]);
    }

    #[test]
    fn empty_applied_state_installs_everything_removes_nothing() {
        let desired = desired_with_apt(&["a", "b"]);
        let applied = AppliedState::default();

        let plan = plan(&desired, &applied);
        let apt = &plan.packages[&Manager::Apt];
        assert_eq!(apt.to_install, vec!["a", "b"]);
        assert!(apt.to_remove.is_empty());
    }

    #[test]
    fn files_deploy_all_and_remove_unmanaged() {
        let mut desired = MachineConfig::default();
        desired.files.insert(
            "bashrc".to_string(),
            FileEntry {
                source: "~/dotfiles/bashrc".to_string(),
                target: "~/.bashrc".to_string(),
                mode: DeployMode::Link,
            },
        );

        let mut applied = AppliedState::default();
        applied.files.push(ManagedFile {
            name: "bashrc".to_string(),
            target: "/home/user/.bashrc".to_string(),
            mode: DeployMode::Link,
            backup: None,
        });
        applied.files.push(ManagedFile {
            name: "old-profile".to_string(),
            target: "/home/user/.profile".to_string(),
            mode: DeployMode::Copy,
            backup: None,
        });

        let plan = plan(&desired, &applied);

        // Every desired entry is handed to the deployer
        assert_eq!(plan.files.to_deploy.len(), 1);
        assert_eq!(plan.files.to_deploy[0].name, "bashrc");

        // Only the entry that left the desired map is removed
        assert_eq!(plan.files.to_remove.len(), 1);
        assert_eq!(plan.files.to_remove[0].name, "old-profile");
    }

    #[test]
    fn binaries_get_default_target() {
        let mut desired = MachineConfig::default();
        desired.binaries.insert(
            "mytool".to_string(),
            crate::schema::BinaryEntry {
                source: "~/dotfiles/bin/mytool".to_string(),
                target: None,
                mode: DeployMode::Copy,
            },
        );

        let plan = plan(&desired, &AppliedState::default());
        assert_eq!(plan.binaries.to_deploy[0].target, "~/.local/bin/mytool");
    }

    #[test]
    fn dconf_settings_pass_through() {
        let mut desired = MachineConfig::default();
        desired
            .dconf
            .insert("/a/b".to_string(), "'value'".to_string());

        let plan = plan(&desired, &AppliedState::default());
        assert_eq!(plan.dconf["/a/b"], "'value'");
    }

    #[test]
    fn has_package_changes() {
        let plan_empty = plan(&MachineConfig::default(), &AppliedState::default());
        assert!(!plan_empty.has_package_changes());

        let plan_install = plan(&desired_with_apt(&["git"]), &AppliedState::default());
        assert!(plan_install.has_package_changes());

        let plan_remove = plan(&MachineConfig::default(), &applied_with_apt(&["git"]));
        assert!(plan_remove.has_package_changes());
    }
}
