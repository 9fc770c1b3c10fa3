//! The convergence run.
//!
//! One engine invocation is a single sequential pass: resolve the include
//! graph, merge (or take the cached model), diff against the applied
//! state, apply package and resource changes one at a time in input order,
//! and finally rewrite the applied state. Sequential on purpose - backup
//! and overwrite ordering stays deterministic, and a cancelled process
//! leaves the previous state file intact because every persisted artifact
//! is committed with rename-after-write.

use crate::cache::{ProbeCache, ResolvedCache};
use crate::conflict::{self, ConflictInfo, ConflictPrompt, PolicyPrompt, Resolution, TerminalPrompt};
use crate::dconf;
use crate::deploy;
use crate::engine::reconcile::{self, DeployPlan, Plan};
use crate::merge::{self, MachineConfig};
use crate::state::{AppliedState, ManagedFile, StateStore};
use crate::{include, paths, progress, ui};
use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use pkgkit::{Client, Manager};
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use thiserror::Error;

/// Marker error for a user-initiated cancellation (conflict prompt Quit).
#[derive(Debug, Error)]
#[error("run cancelled at user request")]
pub struct RunCancelled;

/// Options for one apply run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip prompts and take the non-interactive policy outcome
    pub assume_yes: bool,
}

/// Counters for one apply run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    /// Packages installed
    pub installed: usize,
    /// Packages and resources removed
    pub removed: usize,
    /// Files and binaries placed (created or replaced)
    pub deployed: usize,
    /// Targets moved aside before replacement
    pub backed_up: usize,
    /// Resources already in the desired state
    pub unchanged: usize,
    /// Resources skipped (user choice or safety refusal)
    pub skipped: usize,
    /// Operations that failed
    pub failed: usize,
    /// dconf write results
    pub dconf: dconf::DconfSummary,
}

impl RunSummary {
    /// Whether the run completed without failures.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.dconf.failed == 0
    }

    /// Total number of actual changes made.
    pub fn total_changes(&self) -> usize {
        self.installed + self.removed + self.deployed + self.dconf.changed
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Holds the injected roots and collaborators for one invocation.
pub struct Engine {
    config_path: PathBuf,
    state: StateStore,
    cache: ResolvedCache,
    probes: ProbeCache,
    clients: BTreeMap<Manager, Client>,
}

impl Engine {
    /// Build an engine against the default roots, probing which package
    /// manager CLIs are present.
    pub fn new(config_path: PathBuf) -> Result<Self> {
        let cache_root = paths::cache_dir()?;
        let mut clients = BTreeMap::new();
        for manager in Manager::ALL {
            match Client::new(manager) {
                Ok(client) => {
                    clients.insert(manager, client);
                }
                Err(e) => log::debug!("{manager} backend unavailable: {e}"),
            }
        }

        Ok(Self {
            config_path,
            state: StateStore::new(paths::state_dir()?),
            cache: ResolvedCache::new(&cache_root),
            probes: ProbeCache::new(&cache_root),
            clients,
        })
    }

    /// Build an engine from explicit parts (tests point these at
    /// temporary roots and fake backends).
    pub fn with_parts(
        config_path: PathBuf,
        state: StateStore,
        cache: ResolvedCache,
        probes: ProbeCache,
        clients: BTreeMap<Manager, Client>,
    ) -> Self {
        Self {
            config_path,
            state,
            cache,
            probes,
            clients,
        }
    }

    /// The root document this engine resolves from.
    pub fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve the include graph and produce the merged model, consulting
    /// the fingerprint cache before re-merging.
    pub fn load_model(&self) -> Result<(MachineConfig, Vec<PathBuf>)> {
        let docs = include::resolve(&self.config_path).with_context(|| {
            format!(
                "Failed to resolve configuration rooted at {}",
                self.config_path.display()
            )
        })?;
        let sources: Vec<PathBuf> = docs.iter().map(|d| d.path.clone()).collect();

        if let Some(model) = self.cache.load(&sources) {
            return Ok((model, sources));
        }

        let model = merge::merge(&docs);
        self.cache.store(&model, &sources);
        Ok((model, sources))
    }

    /// Resolve, load applied state, and compute the change sets.
    pub fn plan(&self) -> Result<(MachineConfig, Plan, AppliedState)> {
        let (model, _) = self.load_model()?;
        let applied = self.state.load();
        let plan = reconcile::plan(&model, &applied);
        Ok((model, plan, applied))
    }

    // ========================================================================
    // Apply
    // ========================================================================

    /// Apply a previously computed plan.
    ///
    /// The applied state is rewritten only after the whole pass finishes;
    /// a `RunCancelled` error (user quit at a conflict) leaves the
    /// previous state untouched.
    pub fn apply_plan(
        &self,
        model: &MachineConfig,
        plan: &Plan,
        applied: &AppliedState,
        opts: RunOptions,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut new_state = AppliedState {
            last_updated: Utc::now(),
            ..AppliedState::default()
        };

        // Conflict prompt: interactive only when the policy allows it, a
        // terminal is attached, and the user didn't pass --yes.
        let interactive = model.policy.interactive
            && !opts.assume_yes
            && !opts.dry_run
            && std::io::stdin().is_terminal();
        let mut terminal_prompt = TerminalPrompt;
        let mut policy_prompt = PolicyPrompt {
            backup: model.policy.backup,
        };
        let prompt: &mut dyn ConflictPrompt = if interactive {
            &mut terminal_prompt
        } else {
            &mut policy_prompt
        };

        for manager in Manager::ALL {
            self.apply_packages(manager, model, plan, applied, opts, &mut summary, &mut new_state);
        }

        self.apply_resources(
            "files",
            &plan.files,
            &applied.files,
            applied.last_updated,
            opts,
            prompt,
            &mut summary,
            &mut new_state.files,
        )?;
        self.apply_resources(
            "binaries",
            &plan.binaries,
            &applied.binaries,
            applied.last_updated,
            opts,
            prompt,
            &mut summary,
            &mut new_state.binaries,
        )?;

        if !plan.dconf.is_empty() {
            if dconf::is_available() {
                ui::section("Desktop settings");
                summary.dconf = dconf::apply(&plan.dconf, opts.dry_run);
                println!(
                    "  {} {} changed, {} unchanged",
                    "✓".green(),
                    summary.dconf.changed,
                    summary.dconf.unchanged
                );
            } else {
                log::warn!("dconf not available, skipping {} settings", plan.dconf.len());
                summary.skipped += plan.dconf.len();
            }
        }

        if !opts.dry_run {
            self.state.save(&new_state)?;
        }

        Ok(summary)
    }

    // ========================================================================
    // Packages
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    fn apply_packages(
        &self,
        manager: Manager,
        model: &MachineConfig,
        plan: &Plan,
        applied: &AppliedState,
        opts: RunOptions,
        summary: &mut RunSummary,
        new_state: &mut AppliedState,
    ) {
        let Some(pkg_plan) = plan.packages.get(&manager) else {
            return;
        };

        // Keep previously managed names for untouched managers so the
        // records survive runs where nothing changes.
        let previously = applied.packages.for_manager(manager).to_vec();
        let desired: Vec<String> = {
            let mut seen = std::collections::BTreeSet::new();
            let section = match manager {
                Manager::Apt => &model.packages.apt,
                Manager::Snap => &model.packages.snap,
                Manager::Flatpak => &model.packages.flatpak,
            };
            section
                .install
                .iter()
                .filter(|n| seen.insert(n.as_str()))
                .cloned()
                .collect()
        };

        if pkg_plan.to_install.is_empty() && pkg_plan.to_remove.is_empty() {
            *new_state.packages.for_manager_mut(manager) = desired;
            return;
        }

        let Some(client) = self.clients.get(&manager) else {
            log::warn!(
                "{manager} is not available; skipping {} package changes",
                pkg_plan.to_install.len() + pkg_plan.to_remove.len()
            );
            summary.skipped += pkg_plan.to_install.len() + pkg_plan.to_remove.len();
            *new_state.packages.for_manager_mut(manager) = previously;
            return;
        };

        ui::section(&format!("Packages ({manager})"));

        // Live probe, via the TTL cache. The applied state only reflects
        // this engine's last run; the live system is the real check.
        let installed = match self.probes.load(manager.name()) {
            Some(installed) => installed,
            None => match client.list_installed() {
                Ok(installed) => {
                    self.probes.store(manager.name(), &installed);
                    installed
                }
                Err(e) => {
                    log::warn!("failed to probe {manager} packages: {e}");
                    Vec::new()
                }
            },
        };
        let installed: std::collections::BTreeSet<&str> =
            installed.iter().map(String::as_str).collect();

        let flags = match manager {
            Manager::Apt => &model.packages.apt.flags,
            Manager::Snap => &model.packages.snap.flags,
            Manager::Flatpak => &model.packages.flatpak.flags,
        }
        .clone()
        .unwrap_or_default();

        let missing: Vec<&String> = pkg_plan
            .to_install
            .iter()
            .filter(|name| !installed.contains(name.as_str()))
            .collect();
        summary.unchanged += pkg_plan.to_install.len() - missing.len();

        let mut installed_now = 0usize;
        let mut removed_now = 0usize;
        let mut failed_names: Vec<String> = Vec::new();

        if !missing.is_empty() {
            if opts.dry_run {
                for name in &missing {
                    println!("  {} would install {}", "→".cyan(), name);
                }
            } else {
                let pb = progress::bar(missing.len() as u64, "Installing");
                for name in &missing {
                    match client.install(&[(*name).clone()], &flags) {
                        Ok(()) => {
                            installed_now += 1;
                            pb.set_message(format!("✓ {name}"));
                        }
                        Err(e) => {
                            summary.failed += 1;
                            failed_names.push((*name).clone());
                            log::error!("failed to install {name}: {e}");
                            pb.set_message(format!("✗ {name}"));
                        }
                    }
                    pb.inc(1);
                }
                pb.finish_and_clear();
            }
        }

        for name in &pkg_plan.to_remove {
            if !installed.contains(name.as_str()) {
                // Already gone; just drop it from the records
                summary.unchanged += 1;
                continue;
            }
            if opts.dry_run {
                println!("  {} would remove {}", "→".cyan(), name);
                continue;
            }
            match client.remove(std::slice::from_ref(name)) {
                Ok(()) => removed_now += 1,
                Err(e) => {
                    summary.failed += 1;
                    log::error!("failed to remove {name}: {e}");
                }
            }
        }

        if installed_now > 0 || removed_now > 0 {
            // The live system changed under the probe record
            self.probes.invalidate(manager.name());
        }
        summary.installed += installed_now;
        summary.removed += removed_now;

        *new_state.packages.for_manager_mut(manager) = desired
            .into_iter()
            .filter(|name| !failed_names.contains(name))
            .collect();
    }

    // ========================================================================
    // Files and binaries
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    fn apply_resources(
        &self,
        kind: &str,
        plan: &DeployPlan,
        previously: &[ManagedFile],
        last_applied: chrono::DateTime<Utc>,
        opts: RunOptions,
        prompt: &mut dyn ConflictPrompt,
        summary: &mut RunSummary,
        records: &mut Vec<ManagedFile>,
    ) -> Result<()> {
        if plan.to_deploy.is_empty() && plan.to_remove.is_empty() {
            return Ok(());
        }

        ui::section(&format!("Deploying {kind}"));

        let previous: BTreeMap<&str, &ManagedFile> =
            previously.iter().map(|m| (m.name.as_str(), m)).collect();

        for item in &plan.to_deploy {
            let source = paths::expand(&item.source);
            let target = paths::expand(&item.target);
            let info = ConflictInfo {
                name: &item.name,
                source: &source,
                target: &target,
                mode: item.mode,
            };

            let resolution = match conflict::resolve(&info, prompt) {
                Ok(resolution) => resolution,
                Err(e) => {
                    log::error!("conflict check failed for {}: {e:#}", item.name);
                    summary.failed += 1;
                    keep_previous(&previous, &item.name, records);
                    continue;
                }
            };

            if opts.dry_run {
                match &resolution {
                    Resolution::SkipNoop => summary.unchanged += 1,
                    Resolution::Proceed => {
                        println!("  {} would deploy {}", "→".cyan(), item.name);
                        summary.deployed += 1;
                    }
                    Resolution::Backup(path) => {
                        println!(
                            "  {} would back up {} and deploy {}",
                            "→".cyan(),
                            path.display(),
                            item.name
                        );
                        summary.deployed += 1;
                        summary.backed_up += 1;
                    }
                    Resolution::Skip => summary.skipped += 1,
                    Resolution::Quit => return Err(RunCancelled.into()),
                }
                continue;
            }

            match resolution {
                Resolution::SkipNoop => {
                    summary.unchanged += 1;
                    records.push(ManagedFile {
                        name: item.name.clone(),
                        target: target.display().to_string(),
                        mode: item.mode,
                        backup: previous
                            .get(item.name.as_str())
                            .and_then(|m| m.backup.clone()),
                    });
                }
                Resolution::Proceed => {
                    let existed = target.exists() || target.is_symlink();
                    let result = if existed {
                        deploy::remove_existing(&target)
                            .and_then(|()| deploy::place(&source, &target, item.mode))
                    } else {
                        deploy::place(&source, &target, item.mode)
                    };
                    match result {
                        Ok(()) => {
                            summary.deployed += 1;
                            println!("  {} {}", "✓".green(), item.name);
                            records.push(ManagedFile {
                                name: item.name.clone(),
                                target: target.display().to_string(),
                                mode: item.mode,
                                backup: None,
                            });
                        }
                        Err(e) => {
                            summary.failed += 1;
                            log::error!("failed to deploy {}: {e:#}", item.name);
                            keep_previous(&previous, &item.name, records);
                        }
                    }
                }
                Resolution::Backup(backup) => {
                    let result = deploy::back_up(&target, &backup)
                        .and_then(|()| deploy::place(&source, &target, item.mode));
                    match result {
                        Ok(()) => {
                            summary.deployed += 1;
                            summary.backed_up += 1;
                            println!(
                                "  {} {} {}",
                                "✓".green(),
                                item.name,
                                format!("(backed up to {})", backup.display()).dimmed()
                            );
                            records.push(ManagedFile {
                                name: item.name.clone(),
                                target: target.display().to_string(),
                                mode: item.mode,
                                backup: Some(backup.display().to_string()),
                            });
                        }
                        Err(e) => {
                            summary.failed += 1;
                            log::error!("failed to deploy {}: {e:#}", item.name);
                            keep_previous(&previous, &item.name, records);
                        }
                    }
                }
                Resolution::Skip => {
                    summary.skipped += 1;
                    println!("  {} {} {}", "⊘".yellow(), item.name, "(skipped)".dimmed());
                    keep_previous(&previous, &item.name, records);
                }
                Resolution::Quit => {
                    println!("  {} cancelled", "✗".red());
                    return Err(RunCancelled.into());
                }
            }
        }

        for managed in &plan.to_remove {
            if opts.dry_run {
                println!("  {} would remove {}", "→".cyan(), managed.name);
                continue;
            }
            match deploy::remove_managed(managed, last_applied) {
                Ok(deploy::RemoveOutcome::Removed) => {
                    summary.removed += 1;
                    println!("  {} removed {}", "✓".green(), managed.name);
                }
                Ok(deploy::RemoveOutcome::Missing) => summary.unchanged += 1,
                Ok(deploy::RemoveOutcome::TypeMismatch)
                | Ok(deploy::RemoveOutcome::PossiblyModified) => {
                    // Refused for safety; keep it under management so the
                    // warning repeats until the user resolves it
                    summary.skipped += 1;
                    println!(
                        "  {} kept {} {}",
                        "⚠".yellow(),
                        managed.name,
                        "(looks modified, not removing)".dimmed()
                    );
                    records.push(managed.clone());
                }
                Err(e) => {
                    summary.failed += 1;
                    log::error!("failed to remove {}: {e:#}", managed.name);
                    records.push(managed.clone());
                }
            }
        }

        Ok(())
    }
}

/// Carry a previously recorded entry forward unchanged.
fn keep_previous(
    previous: &BTreeMap<&str, &ManagedFile>,
    name: &str,
    records: &mut Vec<ManagedFile>,
) {
    if let Some(managed) = previous.get(name) {
        records.push((*managed).clone());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakeBackend {
        manager: Manager,
        installed: Mutex<Vec<String>>,
    }

    impl pkgkit::Backend for FakeBackend {
        fn manager(&self) -> Manager {
            self.manager
        }
        fn is_available(&self) -> bool {
            true
        }
        fn is_installed(&self, name: &str) -> pkgkit::Result<bool> {
            Ok(self.installed.lock().unwrap().iter().any(|n| n == name))
        }
        fn list_installed(&self) -> pkgkit::Result<Vec<String>> {
            Ok(self.installed.lock().unwrap().clone())
        }
        fn install(&self, names: &[String], _flags: &[String]) -> pkgkit::Result<()> {
            self.installed.lock().unwrap().extend(names.iter().cloned());
            Ok(())
        }
        fn remove(&self, names: &[String]) -> pkgkit::Result<()> {
            self.installed.lock().unwrap().retain(|n| !names.contains(n));
            Ok(())
        }
    }

    fn engine_in(tmp: &TempDir, root_content: &str, live_apt: &[&str]) -> Engine {
        let config_path = tmp.path().join("converge.toml");
        fs::write(&config_path, root_content).unwrap();

        let mut clients = BTreeMap::new();
        clients.insert(
            Manager::Apt,
            Client::with_backend(Box::new(FakeBackend {
                manager: Manager::Apt,
                installed: Mutex::new(live_apt.iter().map(|s| s.to_string()).collect()),
            })),
        );

        Engine::with_parts(
            config_path,
            StateStore::new(tmp.path().join("state")),
            ResolvedCache::new(tmp.path().join("cache")),
            ProbeCache::new(tmp.path().join("cache")),
            clients,
        )
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_model_hits_cache_on_second_call() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(&tmp, "[packages.apt]\ninstall = [\"git\"]\n", &[]);

        let (first, sources) = engine.load_model().unwrap();
        // A record now exists and validates against unchanged sources
        assert!(engine.cache.load(&sources).is_some());

        let (second, _) = engine.load_model().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn apply_installs_missing_packages_and_persists_state() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(&tmp, "[packages.apt]\ninstall = [\"git\", \"vim\"]\n", &["vim"]);

        let (model, plan, applied) = engine.plan().unwrap();
        let summary = engine
            .apply_plan(&model, &plan, &applied, RunOptions::default())
            .unwrap();

        // vim was live-installed already: only git is actually installed
        assert_eq!(summary.installed, 1);
        assert_eq!(summary.unchanged, 1);

        let state = engine.state.load();
        assert_eq!(state.packages.apt, vec!["git", "vim"]);
    }

    #[test]
    fn apply_removes_unmanaged_packages() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(&tmp, "[packages.apt]\ninstall = [\"git\"]\n", &["git", "old"]);

        // Previous run managed both git and old
        let mut previous = AppliedState::default();
        previous.packages.apt = vec!["git".to_string(), "old".to_string()];
        engine.state.save(&previous).unwrap();

        let (model, plan, applied) = engine.plan().unwrap();
        assert_eq!(plan.packages[&Manager::Apt].to_remove, vec!["old"]);

        let summary = engine
            .apply_plan(&model, &plan, &applied, RunOptions::default())
            .unwrap();
        assert_eq!(summary.removed, 1);

        let state = engine.state.load();
        assert_eq!(state.packages.apt, vec!["git"]);
    }

    #[test]
    fn apply_deploys_links_and_records_them() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "bashrc", "export PATH");
        let target = tmp.path().join("home/.bashrc");

        let root = format!(
            "[files.bashrc]\nsource = \"{}\"\ntarget = \"{}\"\n",
            source.display(),
            target.display()
        );
        let engine = engine_in(&tmp, &root, &[]);

        let (model, plan, applied) = engine.plan().unwrap();
        let summary = engine
            .apply_plan(&model, &plan, &applied, RunOptions::default())
            .unwrap();

        assert_eq!(summary.deployed, 1);
        assert!(target.is_symlink());

        let state = engine.state.load();
        assert_eq!(state.files.len(), 1);
        assert_eq!(state.files[0].name, "bashrc");
    }

    #[test]
    fn second_apply_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "bashrc", "export PATH");
        let target = tmp.path().join("home/.bashrc");

        let root = format!(
            "[files.bashrc]\nsource = \"{}\"\ntarget = \"{}\"\n",
            source.display(),
            target.display()
        );
        let engine = engine_in(&tmp, &root, &[]);

        let (model, plan, applied) = engine.plan().unwrap();
        engine
            .apply_plan(&model, &plan, &applied, RunOptions::default())
            .unwrap();

        let (model, plan, applied) = engine.plan().unwrap();
        let summary = engine
            .apply_plan(&model, &plan, &applied, RunOptions::default())
            .unwrap();

        assert_eq!(summary.deployed, 0);
        assert_eq!(summary.unchanged, 1);
        // Still recorded as managed
        assert_eq!(engine.state.load().files.len(), 1);
    }

    #[test]
    fn conflicting_file_is_backed_up_non_interactively() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "bashrc", "managed content");
        let target = write_file(tmp.path(), ".bashrc", "user content");

        let root = format!(
            "[files.bashrc]\nsource = \"{}\"\ntarget = \"{}\"\nmode = \"copy\"\n",
            source.display(),
            target.display()
        );
        let engine = engine_in(&tmp, &root, &[]);

        let (model, plan, applied) = engine.plan().unwrap();
        // --yes keeps the run on the policy path even under a terminal
        let opts = RunOptions {
            dry_run: false,
            assume_yes: true,
        };
        let summary = engine.apply_plan(&model, &plan, &applied, opts).unwrap();

        assert_eq!(summary.backed_up, 1);
        assert_eq!(fs::read_to_string(&target).unwrap(), "managed content");

        // The original content survives at the recorded backup path
        let state = engine.state.load();
        let backup = state.files[0].backup.as_ref().unwrap();
        assert_eq!(fs::read_to_string(backup).unwrap(), "user content");
    }

    #[test]
    fn removed_config_entry_removes_deployed_link() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "bashrc", "content");
        let target = tmp.path().join(".bashrc");

        let root = format!(
            "[files.bashrc]\nsource = \"{}\"\ntarget = \"{}\"\n",
            source.display(),
            target.display()
        );
        let engine = engine_in(&tmp, &root, &[]);
        let (model, plan, applied) = engine.plan().unwrap();
        engine
            .apply_plan(&model, &plan, &applied, RunOptions::default())
            .unwrap();
        assert!(target.is_symlink());

        // Drop the entry from the config and re-run with the same roots
        fs::write(engine.config_path(), "").unwrap();
        let (model, plan, applied) = engine.plan().unwrap();
        assert_eq!(plan.files.to_remove.len(), 1);

        let summary = engine
            .apply_plan(&model, &plan, &applied, RunOptions::default())
            .unwrap();
        assert_eq!(summary.removed, 1);
        assert!(!target.exists() && !target.is_symlink());
        assert!(engine.state.load().files.is_empty());
    }

    #[test]
    fn dry_run_changes_nothing() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "bashrc", "content");
        let target = tmp.path().join(".bashrc");

        let root = format!(
            "[files.bashrc]\nsource = \"{}\"\ntarget = \"{}\"\n",
            source.display(),
            target.display()
        );
        let engine = engine_in(&tmp, &root, &[]);

        let (model, plan, applied) = engine.plan().unwrap();
        let summary = engine
            .apply_plan(
                &model,
                &plan,
                &applied,
                RunOptions {
                    dry_run: true,
                    assume_yes: false,
                },
            )
            .unwrap();

        assert_eq!(summary.deployed, 1);
        assert!(!target.exists());
        // No state written in dry-run
        assert!(engine.state.load().files.is_empty());
    }
}
