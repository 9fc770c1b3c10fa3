//! `converge apply` - the full convergence run.

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{Engine, RunCancelled, RunOptions, RunSummary};
use crate::ui;
use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use std::io::IsTerminal;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let config_path = super::resolve_config_path(args.config)?;
    let engine = Engine::new(config_path)?;

    ui::header("Converging Machine");
    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let (model, plan, applied) = engine.plan()?;
    super::plan::display(&plan, ctx);

    if plan.total_resources() == 0 {
        return Ok(());
    }

    if !args.yes && !args.dry_run && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    let opts = RunOptions {
        dry_run: args.dry_run,
        assume_yes: args.yes,
    };

    let summary = match engine.apply_plan(&model, &plan, &applied, opts) {
        Ok(summary) => summary,
        Err(e) if e.is::<RunCancelled>() => {
            println!();
            ui::warn("Run cancelled - applied state left unchanged");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    print_summary(&summary, args.dry_run);
    Ok(())
}

/// Confirm with the user; non-terminal runs proceed without asking.
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    if !std::io::stdin().is_terminal() {
        return Ok(true);
    }

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()
        .context("Failed to read confirmation")?;

    Ok(confirmed)
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return;
    }

    if !summary.is_success() {
        println!("  {} Converged with errors", "⚠".yellow().bold());
    } else if summary.total_changes() == 0 {
        println!("  {} Machine already converged", "✓".green().bold());
    } else {
        println!("  {} Machine converged", "✓".green().bold());
    }

    if summary.installed > 0 {
        println!("    • {} packages installed", summary.installed);
    }
    if summary.deployed > 0 {
        println!("    • {} resources deployed", summary.deployed);
    }
    if summary.backed_up > 0 {
        println!("    • {} targets backed up", summary.backed_up);
    }
    if summary.removed > 0 {
        println!("    • {} resources removed", summary.removed);
    }
    if summary.dconf.changed > 0 {
        println!("    • {} settings written", summary.dconf.changed);
    }
    if summary.unchanged > 0 {
        println!("    • {} already in the desired state", summary.unchanged);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.failed > 0 || summary.dconf.failed > 0 {
        println!(
            "    • {} {}",
            summary.failed + summary.dconf.failed,
            "failed".red()
        );
    }
}
