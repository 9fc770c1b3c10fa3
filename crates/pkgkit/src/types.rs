//! Core types shared across package manager backends.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported Linux package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Manager {
    /// Debian/Ubuntu packages via apt-get and dpkg-query
    Apt,
    /// Snap packages via snapd
    Snap,
    /// Flatpak applications
    Flatpak,
}

impl Manager {
    /// All managers, in the order they are applied.
    ///
    /// apt goes first: snaps and flatpaks occasionally depend on
    /// apt-provided runtimes being present.
    pub const ALL: [Manager; 3] = [Manager::Apt, Manager::Snap, Manager::Flatpak];

    /// The canonical lowercase name used in configs and cache records.
    pub fn name(self) -> &'static str {
        match self {
            Manager::Apt => "apt",
            Manager::Snap => "snap",
            Manager::Flatpak => "flatpak",
        }
    }

    /// Parse a manager name as it appears in configuration.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "apt" => Some(Manager::Apt),
            "snap" => Some(Manager::Snap),
            "flatpak" => Some(Manager::Flatpak),
            _ => None,
        }
    }
}

impl fmt::Display for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
