//! flatpak backend wrapping the `flatpak` CLI.
//!
//! Runs in user scope (`--user` is not forced; flatpak picks the default
//! installation), so no privilege escalation is involved.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::Manager;
use std::process::Command;

/// Backend that executes real `flatpak` commands.
pub struct FlatpakBackend;

impl FlatpakBackend {
    /// Create a new FlatpakBackend.
    pub fn new() -> Self {
        Self
    }

    fn flatpak(&self, args: &[&str]) -> Result<std::process::Output> {
        let output = Command::new("flatpak")
            .args(args)
            .output()
            .map_err(|e| Error::CommandFailed {
                message: format!("failed to execute flatpak: {e}"),
                stderr: String::new(),
            })?;
        Ok(output)
    }

    fn flatpak_checked(&self, args: &[&str], package_name: Option<&str>) -> Result<()> {
        let output = self.flatpak(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let err = Error::from_command_output(Manager::Flatpak, &stderr, package_name);
            if !err.is_ignorable() {
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Default for FlatpakBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for FlatpakBackend {
    fn manager(&self) -> Manager {
        Manager::Flatpak
    }

    fn is_available(&self) -> bool {
        Command::new("flatpak")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn is_installed(&self, name: &str) -> Result<bool> {
        Ok(self.list_installed()?.iter().any(|app| app == name))
    }

    fn list_installed(&self) -> Result<Vec<String>> {
        let output = self.flatpak(&["list", "--app", "--columns=application"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_command_output(Manager::Flatpak, &stderr, None));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_flatpak_list(&stdout))
    }

    fn install(&self, names: &[String], flags: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&str> = vec!["install", "-y", "--noninteractive"];
        args.extend(flags.iter().map(String::as_str));
        args.extend(names.iter().map(String::as_str));
        self.flatpak_checked(&args, names.first().map(String::as_str))
    }

    fn remove(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&str> = vec!["uninstall", "-y"];
        args.extend(names.iter().map(String::as_str));
        self.flatpak_checked(&args, names.first().map(String::as_str))
    }
}

/// Parse `flatpak list --columns=application` output (one app id per line).
fn parse_flatpak_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
