//! Magic numbers of the trailer

use ifw_errors::FormatError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cookie closing an installer trailer
pub const MAGIC_COOKIE: u64 = 0xc263_0a1c_99d6_68f8;

/// Cookie closing a separate data file
pub const MAGIC_COOKIE_DATA: u64 = 0xc263_0a1c_99d6_68f9;

/// Backward scan window when looking for the cookie
pub const MAX_MARKER_SCAN: u64 = 1024 * 1024;

/// Seven `i64` fields
pub const HEADER_SIZE: u64 = 7 * 8;

/// What kind of executable carries the trailer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Installer,
    Uninstaller,
    Updater,
    PackageManager,
}

impl Marker {
    #[must_use]
    pub const fn value(self) -> i64 {
        match self {
            Self::Installer => 0x1202_3233,
            Self::Uninstaller => 0x1202_3234,
            Self::Updater => 0x1202_3235,
            Self::PackageManager => 0x1202_3236,
        }
    }

    /// The maintenance tool acts as uninstaller, updater and package manager
    #[must_use]
    pub const fn is_maintenance_tool(self) -> bool {
        !matches!(self, Self::Installer)
    }
}

impl TryFrom<i64> for Marker {
    type Error = FormatError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        [
            Self::Installer,
            Self::Uninstaller,
            Self::Updater,
            Self::PackageManager,
        ]
        .into_iter()
        .find(|m| m.value() == value)
        .ok_or(FormatError::UnexpectedMarker { marker: value })
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Installer => "installer",
            Self::Uninstaller => "uninstaller",
            Self::Updater => "updater",
            Self::PackageManager => "package manager",
        })
    }
}
