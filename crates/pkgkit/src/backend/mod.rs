//! Backend trait and real backend implementations.
//!
//! Each backend wraps one package manager CLI. The trait is the seam the
//! convergence engine consumes; tests substitute an in-memory fake.

use crate::error::Result;
use crate::types::Manager;

pub mod apt;
pub mod flatpak;
pub mod snap;

/// Capability interface for a single package manager.
///
/// Installed-state probes answer for the *live* system, not any recorded
/// state: the engine's applied-state file only reflects its own last run,
/// so backends are always re-consulted before installing.
pub trait Backend: Send + Sync {
    /// Which manager this backend drives.
    fn manager(&self) -> Manager;

    /// Whether the manager's CLI is present and responding.
    fn is_available(&self) -> bool;

    /// Check if a single package is installed.
    fn is_installed(&self, name: &str) -> Result<bool>;

    /// List all installed package names.
    fn list_installed(&self) -> Result<Vec<String>>;

    /// Install packages, applying the given default flags.
    fn install(&self, names: &[String], flags: &[String]) -> Result<()>;

    /// Remove packages.
    fn remove(&self, names: &[String]) -> Result<()>;
}

/// Construct the real backend for a manager.
pub fn default_backend(manager: Manager) -> Box<dyn Backend> {
    match manager {
        Manager::Apt => Box::new(apt::AptBackend::new()),
        Manager::Snap => Box::new(snap::SnapBackend::new()),
        Manager::Flatpak => Box::new(flatpak::FlatpakBackend::new()),
    }
}
