use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "converge")]
#[command(version)]
#[command(about = "Declarative Linux machine configuration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Converge the machine to the configured state
    Apply(ApplyArgs),

    /// Preview what apply would change
    Plan(PlanArgs),

    /// Show applied state and cache freshness
    Status,

    /// Manage the resolution and probe caches
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Root config document (defaults to converge.toml in the config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Dry run - show what would be done
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip confirmation and conflict prompts; take the policy outcome
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Root config document (defaults to converge.toml in the config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum CacheCommand {
    /// Show cache records and their freshness
    Status,

    /// Remove all cache records
    Clear,
}
