//! apt backend using `apt-get` for mutations and `dpkg-query` for probes.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::Manager;
use std::process::Command;

/// Backend that executes real `apt-get` / `dpkg-query` commands.
///
/// Mutating operations run under `sudo`; probes do not need it.
pub struct AptBackend {
    /// Command used for privilege escalation (empty disables it, for tests)
    sudo: Option<String>,
}

impl AptBackend {
    /// Create a new AptBackend that escalates via `sudo`.
    pub fn new() -> Self {
        Self {
            sudo: Some("sudo".to_string()),
        }
    }

    /// Create a backend that never escalates (containers, CI).
    pub fn without_sudo() -> Self {
        Self { sudo: None }
    }

    fn apt_get(&self, args: &[&str]) -> Result<std::process::Output> {
        let mut cmd = match &self.sudo {
            Some(sudo) => {
                let mut c = Command::new(sudo);
                c.arg("apt-get");
                c
            }
            None => Command::new("apt-get"),
        };
        cmd.env("DEBIAN_FRONTEND", "noninteractive");
        let output = cmd.args(args).output().map_err(|e| Error::CommandFailed {
            message: format!("failed to execute apt-get: {e}"),
            stderr: String::new(),
        })?;
        Ok(output)
    }

    fn apt_get_checked(&self, args: &[&str], package_name: Option<&str>) -> Result<()> {
        let output = self.apt_get(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_command_output(
                Manager::Apt,
                &stderr,
                package_name,
            ));
        }
        Ok(())
    }
}

impl Default for AptBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for AptBackend {
    fn manager(&self) -> Manager {
        Manager::Apt
    }

    fn is_available(&self) -> bool {
        Command::new("apt-get")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn is_installed(&self, name: &str) -> Result<bool> {
        let output = Command::new("dpkg-query")
            .args(["-W", "-f=${Status}", name])
            .output()
            .map_err(|e| Error::CommandFailed {
                message: format!("failed to execute dpkg-query: {e}"),
                stderr: String::new(),
            })?;

        // dpkg-query exits non-zero for unknown packages
        if !output.status.success() {
            return Ok(false);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.contains("install ok installed"))
    }

    fn list_installed(&self) -> Result<Vec<String>> {
        let output = Command::new("dpkg-query")
            .args(["-W", "-f=${binary:Package} ${Status}\n"])
            .output()
            .map_err(|_| Error::ManagerNotFound {
                manager: Manager::Apt,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_command_output(Manager::Apt, &stderr, None));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_dpkg_list(&stdout))
    }

    fn install(&self, names: &[String], flags: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&str> = vec!["install", "-y"];
        args.extend(flags.iter().map(String::as_str));
        args.extend(names.iter().map(String::as_str));
        self.apt_get_checked(&args, names.first().map(String::as_str))
    }

    fn remove(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&str> = vec!["remove", "-y"];
        args.extend(names.iter().map(String::as_str));
        self.apt_get_checked(&args, names.first().map(String::as_str))
    }
}

/// Parse `dpkg-query -W -f='${binary:Package} ${Status}\n'` output.
fn parse_dpkg_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| line.ends_with("install ok installed"))
        .filter_map(|line| line.split_whitespace().next())
        // Strip the architecture qualifier ("libfoo:amd64" -> "libfoo")
        .map(|name| name.split(':').next().unwrap_or(name).to_string())
        .collect()
}
