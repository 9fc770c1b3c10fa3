//! `converge status` - summarize the applied state and cache freshness.

use crate::Context;
use crate::paths;
use crate::state::StateStore;
use crate::ui;
use anyhow::Result;
use colored::Colorize;

pub fn run(ctx: &Context) -> Result<()> {
    ui::header("Converge Status");

    let state_root = paths::state_dir()?;
    let state_file = state_root.join("state.toml");
    if !state_file.exists() {
        ui::info("No applied state recorded yet - run 'converge apply' first");
        return Ok(());
    }

    let state = StateStore::new(&state_root).load();

    ui::kv("State file", &state_file.display().to_string());
    ui::kv(
        "Last run",
        &state.last_updated.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );

    ui::section("Managed packages");
    for (manager, names) in [
        ("apt", &state.packages.apt),
        ("snap", &state.packages.snap),
        ("flatpak", &state.packages.flatpak),
    ] {
        if names.is_empty() {
            continue;
        }
        println!("  {} {:<8} {}", "✓".green(), manager, names.len());
        if !ctx.quiet {
            ui::dim(&format!("  {}", names.join(", ")));
        }
    }

    if !state.files.is_empty() || !state.binaries.is_empty() {
        ui::section("Managed resources");
        for managed in state.files.iter().chain(state.binaries.iter()) {
            let mode = format!("{:?}", managed.mode).to_lowercase();
            println!(
                "  {} {:<20} {} {}",
                "✓".green(),
                managed.name,
                managed.target.dimmed(),
                format!("({mode})").dimmed()
            );
            if ctx.verbose > 0
                && let Some(backup) = &managed.backup
            {
                ui::dim(&format!("  backup: {backup}"));
            }
        }
    }

    super::cache::show_records(paths::cache_dir()?.as_path())?;
    Ok(())
}
