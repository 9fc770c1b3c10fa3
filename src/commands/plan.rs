//! `converge plan` - preview the change sets without touching anything.

use crate::Context;
use crate::cli::PlanArgs;
use crate::engine::{Engine, Plan};
use crate::ui;
use anyhow::Result;
use colored::Colorize;

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let config_path = super::resolve_config_path(args.config)?;
    let engine = Engine::new(config_path)?;

    ui::header("Configuration Plan");
    let (_, plan, _) = engine.plan()?;
    display(&plan, ctx);
    Ok(())
}

/// Render a plan the way `apply` previews it.
pub fn display(plan: &Plan, ctx: &Context) {
    let mut any = false;

    for (manager, pkg_plan) in &plan.packages {
        if pkg_plan.to_install.is_empty() && pkg_plan.to_remove.is_empty() {
            continue;
        }
        any = true;
        ui::section(&format!("Packages ({manager})"));
        for name in &pkg_plan.to_install {
            println!("  {} {}", "+".green(), name);
        }
        for name in &pkg_plan.to_remove {
            println!("  {} {}", "-".red(), name);
        }
    }

    if !plan.files.to_deploy.is_empty() || !plan.files.to_remove.is_empty() {
        any = true;
        ui::section("Files");
        display_deploys(&plan.files, ctx);
    }
    if !plan.binaries.to_deploy.is_empty() || !plan.binaries.to_remove.is_empty() {
        any = true;
        ui::section("Binaries");
        display_deploys(&plan.binaries, ctx);
    }

    if !plan.dconf.is_empty() {
        any = true;
        ui::section("Desktop settings");
        if ctx.quiet {
            println!("  {} {} keys ensured", "~".yellow(), plan.dconf.len());
        } else {
            for (key, value) in &plan.dconf {
                println!("  {} {} = {}", "~".yellow(), key, value.dimmed());
            }
        }
    }

    if !any {
        println!();
        ui::success("No changes needed");
    }
}

fn display_deploys(deploy_plan: &crate::engine::DeployPlan, ctx: &Context) {
    for item in &deploy_plan.to_deploy {
        let mode = format!("{:?}", item.mode).to_lowercase();
        if ctx.quiet {
            println!("  {} {}", "~".yellow(), item.name);
        } else {
            println!(
                "  {} {} {} {}",
                "~".yellow(),
                item.name,
                format!("-> {}", item.target).dimmed(),
                format!("({mode})").dimmed()
            );
        }
    }
    for managed in &deploy_plan.to_remove {
        println!(
            "  {} {} {}",
            "-".red(),
            managed.name,
            format!("({})", managed.target).dimmed()
        );
    }
}
