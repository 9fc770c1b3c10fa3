//! `converge cache` - inspect or drop the persisted caches.

use crate::cache;
use crate::cli::CacheCommand;
use crate::paths;
use crate::ui;
use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::path::Path;

pub fn run(cmd: CacheCommand) -> Result<()> {
    let root = paths::cache_dir()?;
    match cmd {
        CacheCommand::Status => {
            ui::header("Cache Status");
            ui::kv("Cache root", &root.display().to_string());
            show_records(&root)
        }
        CacheCommand::Clear => {
            let removed = cache::clear(&root)?;
            ui::success(&format!("Removed {removed} cache records"));
            Ok(())
        }
    }
}

/// List cache records with their age.
pub fn show_records(root: &Path) -> Result<()> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(_) => {
            ui::section("Caches");
            ui::dim("(no cache records)");
            return Ok(());
        }
    };

    let mut records: Vec<(String, String)> = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.ends_with(".json")
            || !(name.starts_with("resolved-") || name.starts_with("probe-"))
        {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(|modified| {
                let age = Utc::now() - DateTime::<Utc>::from(modified);
                if age.num_hours() > 0 {
                    format!("{}h old", age.num_hours())
                } else {
                    format!("{}m old", age.num_minutes().max(0))
                }
            })
            .unwrap_or_else(|_| "age unknown".to_string());

        records.push((name, age));
    }
    records.sort();

    ui::section("Caches");
    if records.is_empty() {
        ui::dim("(no cache records)");
    }
    for (name, age) in records {
        println!("  {} {:<40} {}", "○".cyan(), name, age.dimmed());
    }
    Ok(())
}
