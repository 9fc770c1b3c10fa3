//! snap backend wrapping the `snap` CLI.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::Manager;
use std::process::Command;

/// Backend that executes real `snap` commands.
pub struct SnapBackend {
    sudo: Option<String>,
}

impl SnapBackend {
    /// Create a new SnapBackend that escalates via `sudo`.
    pub fn new() -> Self {
        Self {
            sudo: Some("sudo".to_string()),
        }
    }

    /// Create a backend that never escalates (containers, CI).
    pub fn without_sudo() -> Self {
        Self { sudo: None }
    }

    fn snap(&self, args: &[&str], escalate: bool) -> Result<std::process::Output> {
        let mut cmd = match (&self.sudo, escalate) {
            (Some(sudo), true) => {
                let mut c = Command::new(sudo);
                c.arg("snap");
                c
            }
            _ => Command::new("snap"),
        };
        let output = cmd.args(args).output().map_err(|e| Error::CommandFailed {
            message: format!("failed to execute snap: {e}"),
            stderr: String::new(),
        })?;
        Ok(output)
    }
}

impl Default for SnapBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for SnapBackend {
    fn manager(&self) -> Manager {
        Manager::Snap
    }

    fn is_available(&self) -> bool {
        Command::new("snap")
            .arg("version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn is_installed(&self, name: &str) -> Result<bool> {
        let output = self.snap(&["list", name], false)?;
        Ok(output.status.success())
    }

    fn list_installed(&self) -> Result<Vec<String>> {
        let output = self.snap(&["list"], false)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // "no snaps installed" exits non-zero but is an empty list
            if stderr.to_lowercase().contains("no snaps") {
                return Ok(Vec::new());
            }
            return Err(Error::from_command_output(Manager::Snap, &stderr, None));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_snap_list(&stdout))
    }

    fn install(&self, names: &[String], flags: &[String]) -> Result<()> {
        // snap refuses multi-package installs when flags like --classic are
        // present, so install one at a time for uniform behavior.
        for name in names {
            let mut args: Vec<&str> = vec!["install", name.as_str()];
            args.extend(flags.iter().map(String::as_str));

            let output = self.snap(&args, true)?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let err = Error::from_command_output(Manager::Snap, &stderr, Some(name.as_str()));
                if !err.is_ignorable() {
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn remove(&self, names: &[String]) -> Result<()> {
        for name in names {
            let output = self.snap(&["remove", name.as_str()], true)?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(Error::from_command_output(
                    Manager::Snap,
                    &stderr,
                    Some(name.as_str()),
                ));
            }
        }
        Ok(())
    }
}

/// Parse `snap list` output (header row, then name-first columns).
fn parse_snap_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(String::from)
        .collect()
}
