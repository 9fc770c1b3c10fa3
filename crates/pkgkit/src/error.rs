//! Error types for package manager operations.
//!
//! Errors are categorized so callers can decide what to surface and what
//! to ignore. Each backend classifies its command's stderr into a category
//! with the same pattern-matching approach, since none of the three
//! managers exposes structured error output.

use crate::types::Manager;
use thiserror::Error;

/// Categories of package manager errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (mirror unreachable, fetch failed)
    Network,
    /// Package not found in any configured source
    NotFound,
    /// Permission denied (apt without sudo, snapd socket)
    Permission,
    /// Package is already installed
    AlreadyInstalled,
    /// The manager's CLI is not installed or not in PATH
    ManagerNotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error can be safely ignored (operation already done).
    pub fn is_ignorable(&self) -> bool {
        matches!(self, Self::AlreadyInstalled)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Package not found",
            Self::Permission => "Permission denied",
            Self::AlreadyInstalled => "Already installed",
            Self::ManagerNotFound => "Package manager not installed",
            Self::Other => "Unexpected error",
        }
    }
}

/// Errors that can occur during package manager operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-related error (connection, timeout, DNS, etc.)
    #[error("network error: {message}")]
    Network {
        /// Detailed error message from the failed network operation
        message: String,
    },

    /// Package not found in any configured source
    #[error("package not found: {name}")]
    NotFound {
        /// Name of the package that could not be found
        name: String,
    },

    /// Permission denied
    #[error("permission denied: {message}")]
    Permission {
        /// Details about what permission was denied
        message: String,
    },

    /// Package is already installed
    #[error("already installed: {name}")]
    AlreadyInstalled {
        /// Name of the already-installed package
        name: String,
    },

    /// The manager's CLI is not installed or not in PATH
    #[error("{manager} is not available on this system")]
    ManagerNotFound {
        /// The manager whose CLI could not be found
        manager: Manager,
    },

    /// Command execution failed
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network { .. } => ErrorCategory::Network,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::AlreadyInstalled { .. } => ErrorCategory::AlreadyInstalled,
            Error::ManagerNotFound { .. } => ErrorCategory::ManagerNotFound,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error can be safely ignored.
    pub fn is_ignorable(&self) -> bool {
        self.category().is_ignorable()
    }

    /// Create an error from a package manager command's output.
    ///
    /// Analyzes stderr to categorize the error appropriately. The patterns
    /// cover apt-get/dpkg, snap, and flatpak phrasing.
    pub fn from_command_output(manager: Manager, stderr: &str, package_name: Option<&str>) -> Self {
        let stderr_lower = stderr.to_lowercase();

        // Network errors
        if stderr_lower.contains("could not resolve")
            || stderr_lower.contains("connection refused")
            || stderr_lower.contains("timed out")
            || stderr_lower.contains("temporary failure")
            || stderr_lower.contains("failed to fetch")
            || stderr_lower.contains("network is unreachable")
            || stderr_lower.contains("error while downloading")
        {
            return Error::Network {
                message: stderr.trim().to_string(),
            };
        }

        // Not found errors
        if stderr_lower.contains("unable to locate package")
            || stderr_lower.contains("has no installation candidate")
            || stderr_lower.contains("not found in sideload")
            || stderr_lower.contains("snap not found")
            || stderr_lower.contains("no remote refs found")
            || stderr_lower.contains("nothing matches")
        {
            return Error::NotFound {
                name: package_name.unwrap_or("unknown").to_string(),
            };
        }

        // Already installed
        if stderr_lower.contains("already installed")
            || stderr_lower.contains("is already the newest version")
        {
            return Error::AlreadyInstalled {
                name: package_name.unwrap_or("unknown").to_string(),
            };
        }

        // Permission errors
        if stderr_lower.contains("permission denied")
            || stderr_lower.contains("are you root")
            || stderr_lower.contains("requires root")
            || stderr_lower.contains("access denied")
        {
            return Error::Permission {
                message: stderr.trim().to_string(),
            };
        }

        // Default to command failed
        Error::CommandFailed {
            message: format!(
                "{manager} command failed{}",
                package_name
                    .map(|n| format!(" for {n}"))
                    .unwrap_or_default()
            ),
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for package manager operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_ignorable() {
        assert!(ErrorCategory::AlreadyInstalled.is_ignorable());
        assert!(!ErrorCategory::Network.is_ignorable());
        assert!(!ErrorCategory::NotFound.is_ignorable());
    }

    #[test]
    fn test_from_output_network() {
        let err = Error::from_command_output(
            Manager::Apt,
            "Err:1 http://archive.ubuntu.com jammy InRelease\n  Could not resolve 'archive.ubuntu.com'",
            Some("curl"),
        );
        assert_eq!(err.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_from_output_not_found_apt() {
        let err = Error::from_command_output(
            Manager::Apt,
            "E: Unable to locate package frobnicator",
            Some("frobnicator"),
        );
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_from_output_not_found_snap() {
        let err = Error::from_command_output(
            Manager::Snap,
            "error: snap \"frob\" not found",
            Some("frob"),
        );
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_from_output_already_installed() {
        let err = Error::from_command_output(
            Manager::Apt,
            "git is already the newest version (1:2.34.1).",
            Some("git"),
        );
        assert_eq!(err.category(), ErrorCategory::AlreadyInstalled);
        assert!(err.is_ignorable());
    }

    #[test]
    fn test_from_output_permission() {
        let err = Error::from_command_output(
            Manager::Apt,
            "E: Could not open lock file - open (13: Permission denied), are you root?",
            Some("git"),
        );
        assert_eq!(err.category(), ErrorCategory::Permission);
    }

    #[test]
    fn test_from_output_fallback() {
        let err = Error::from_command_output(Manager::Flatpak, "something exploded", Some("app"));
        assert_eq!(err.category(), ErrorCategory::Other);
        assert!(err.to_string().contains("flatpak"));
    }
}
