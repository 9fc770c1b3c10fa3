//! # pkgkit
//!
//! Pure Rust library for Linux package manager integration.
//!
//! This crate provides a uniform capability interface over apt, snap, and
//! flatpak:
//! - Probing live installation status (the source of truth for "installed")
//! - Installing packages with per-manager default flags
//! - Removing packages
//!
//! ## Example
//!
//! ```no_run
//! use pkgkit::{Client, Manager};
//!
//! // Create a client for a manager
//! let client = Client::new(Manager::Apt).expect("apt not available");
//!
//! // Probe live state
//! let installed = client.list_installed().expect("probe failed");
//! println!("{} packages installed", installed.len());
//!
//! // Install with default flags
//! client.install(&["git".to_string()], &[]).expect("install failed");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::Backend;
pub use error::{Error, ErrorCategory, Result};
pub use types::Manager;

/// High-level client for one package manager.
///
/// The client wraps a backend and is the unit the convergence engine holds,
/// one per manager declared in the configuration.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a new Client with the real backend for a manager.
    ///
    /// Returns an error if the manager's CLI is not available.
    pub fn new(manager: Manager) -> Result<Self> {
        let backend = backend::default_backend(manager);
        if !backend.is_available() {
            return Err(Error::ManagerNotFound { manager });
        }
        Ok(Self { backend })
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Which manager this client drives.
    pub fn manager(&self) -> Manager {
        self.backend.manager()
    }

    /// Check if the manager's CLI is available.
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Check if a package is installed on the live system.
    pub fn is_installed(&self, name: &str) -> Result<bool> {
        self.backend.is_installed(name)
    }

    /// List all installed package names.
    pub fn list_installed(&self) -> Result<Vec<String>> {
        self.backend.list_installed()
    }

    /// Install packages with the given default flags.
    ///
    /// Already-installed packages are not an error.
    pub fn install(&self, names: &[String], flags: &[String]) -> Result<()> {
        match self.backend.install(names, flags) {
            Err(e) if e.is_ignorable() => Ok(()),
            other => other,
        }
    }

    /// Remove packages.
    pub fn remove(&self, names: &[String]) -> Result<()> {
        self.backend.remove(names)
    }
}
