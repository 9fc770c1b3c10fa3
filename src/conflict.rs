//! Conflict resolution for pre-existing destination resources.
//!
//! A small state machine runs per resource: an absent target proceeds
//! unconditionally, an identical target is an idempotent no-op, and a
//! differing target is put to a `ConflictPrompt`. The prompt is a
//! capability: the terminal implementation asks the user, while the
//! policy implementation always answers with the non-interactive outcome,
//! which keeps the pipeline synchronous and testable without a terminal.

use crate::deploy;
use crate::schema::DeployMode;
use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Types
// ============================================================================

/// Everything a prompt needs to describe one conflict.
#[derive(Debug, Clone, Copy)]
pub struct ConflictInfo<'a> {
    /// Resource name from the configuration
    pub name: &'a str,
    /// Desired source path (expanded)
    pub source: &'a Path,
    /// Destination path (expanded)
    pub target: &'a Path,
    /// Deployment mode
    pub mode: DeployMode,
}

/// Terminal outcome of the conflict state machine for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Deploy (after removing whatever sits at the target)
    Proceed,
    /// Target already matches; do nothing
    SkipNoop,
    /// Move the target to this path, then deploy
    Backup(PathBuf),
    /// User chose to leave this resource alone
    Skip,
    /// User chose to cancel the whole run
    Quit,
}

/// One answer from a prompt. `ViewDiff` is a side query, not a
/// transition: the state machine loops back and asks again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    /// Leave this resource alone
    Skip,
    /// Overwrite the target in place
    Overwrite,
    /// Back up the target, then overwrite
    BackupThenOverwrite,
    /// Show what differs, then ask again
    ViewDiff,
    /// Cancel the whole run
    Quit,
}

/// Capability interface for answering conflicts.
pub trait ConflictPrompt {
    /// Decide what to do about one conflicting resource.
    fn ask(&mut self, info: &ConflictInfo) -> Result<PromptChoice>;
}

// ============================================================================
// State machine
// ============================================================================

/// Decide what to do about one destination resource.
pub fn resolve(info: &ConflictInfo, prompt: &mut dyn ConflictPrompt) -> Result<Resolution> {
    // Absent: nothing to conflict with.
    if !info.target.exists() && !info.target.is_symlink() {
        return Ok(Resolution::Proceed);
    }

    // Present and identical: idempotent no-op.
    if deploy::identical(info.target, info.source, info.mode)? {
        return Ok(Resolution::SkipNoop);
    }

    // Present and differing: the prompt decides. ViewDiff loops back into
    // the same state without resolving.
    loop {
        match prompt.ask(info)? {
            PromptChoice::Skip => return Ok(Resolution::Skip),
            PromptChoice::Overwrite => return Ok(Resolution::Proceed),
            PromptChoice::BackupThenOverwrite => {
                return Ok(Resolution::Backup(deploy::backup_path(
                    info.target,
                    Utc::now(),
                )));
            }
            PromptChoice::Quit => return Ok(Resolution::Quit),
            PromptChoice::ViewDiff => show_diff(info),
        }
    }
}

// ============================================================================
// Prompt implementations
// ============================================================================

/// No-terminal prompt: always answers with the configured policy outcome.
pub struct PolicyPrompt {
    /// Whether conflicting targets are backed up before overwrite
    pub backup: bool,
}

impl ConflictPrompt for PolicyPrompt {
    fn ask(&mut self, info: &ConflictInfo) -> Result<PromptChoice> {
        if self.backup {
            log::info!("backing up conflicting target {}", info.target.display());
            Ok(PromptChoice::BackupThenOverwrite)
        } else {
            log::info!("overwriting conflicting target {}", info.target.display());
            Ok(PromptChoice::Overwrite)
        }
    }
}

/// Interactive prompt backed by dialoguer.
pub struct TerminalPrompt;

impl ConflictPrompt for TerminalPrompt {
    fn ask(&mut self, info: &ConflictInfo) -> Result<PromptChoice> {
        use dialoguer::Select;

        println!();
        println!(
            "  {} {} already exists at {}",
            "⚠".yellow(),
            info.name.bold(),
            info.target.display()
        );

        let choice = Select::new()
            .with_prompt("How do you want to resolve this conflict?")
            .items(&[
                "Skip this resource",
                "Overwrite",
                "Back up, then overwrite",
                "View diff",
                "Quit",
            ])
            .default(2)
            .interact()
            .context("Failed to read conflict choice")?;

        Ok(match choice {
            0 => PromptChoice::Skip,
            1 => PromptChoice::Overwrite,
            2 => PromptChoice::BackupThenOverwrite,
            3 => PromptChoice::ViewDiff,
            _ => PromptChoice::Quit,
        })
    }
}

/// Print what differs between the target and the desired source.
fn show_diff(info: &ConflictInfo) {
    match info.mode {
        DeployMode::Link => {
            let current = fs::read_link(info.target)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "(not a symlink)".to_string());
            println!("    current: {}", current.red());
            println!("    desired: -> {}", info.source.display().to_string().green());
        }
        DeployMode::Copy => {
            let (Ok(current), Ok(desired)) = (
                fs::read_to_string(info.target),
                fs::read_to_string(info.source),
            ) else {
                println!("    {}", "(binary or unreadable content)".dimmed());
                return;
            };

            let diff = similar::TextDiff::from_lines(&current, &desired);
            for change in diff.iter_all_changes() {
                match change.tag() {
                    similar::ChangeTag::Delete => print!("    {}", format!("- {change}").red()),
                    similar::ChangeTag::Insert => print!("    {}", format!("+ {change}").green()),
                    similar::ChangeTag::Equal => {}
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
