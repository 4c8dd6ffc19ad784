#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Operating system boundary for the installer engine
//!
//! - Process execution that tells a launch failure, a crash and a non-zero
//!   exit apart
//! - Filesystem helpers (copy preserving permissions, cross-device move,
//!   atomic write)
//! - The elevation token that privileged operations check before running

pub mod elevation;
pub mod filesystem;
pub mod process;

pub use elevation::{ElevationProvider, ElevationToken, StaticElevation};
pub use process::{CommandOutput, PlatformCommand};

/// Well-known per-user directories used for variable substitution and
/// desktop integration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDirs {
    pub home: std::path::PathBuf,
    pub config: std::path::PathBuf,
    pub data: std::path::PathBuf,
}

impl UserDirs {
    /// Resolve from the environment, falling back to the temp dir when no
    /// home directory is known (containers, CI)
    #[must_use]
    pub fn detect() -> Self {
        let home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            config: dirs::config_dir().unwrap_or_else(|| home.join(".config")),
            data: dirs::data_dir().unwrap_or_else(|| home.join(".local").join("share")),
            home,
        }
    }

    /// All three directories below `root`, for tests and sandboxed runs
    #[must_use]
    pub fn rooted_at(root: &std::path::Path) -> Self {
        Self {
            home: root.to_path_buf(),
            config: root.join(".config"),
            data: root.join(".local").join("share"),
        }
    }
}
