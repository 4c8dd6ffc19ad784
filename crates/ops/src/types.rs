//! Types for operations and results

use ifw_types::Version;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a component stands relative to the repositories
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    /// Installed and current
    Installed,
    /// Installed, a newer version is available
    Outdated,
    /// Offered by a repository, not installed
    Available,
}

/// One row of `list`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentListing {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub installed_version: Option<Version>,
    pub available_version: Option<Version>,
    pub status: ComponentStatus,
    pub dependencies: Vec<String>,
    /// Uncompressed size in bytes
    pub size: u64,
}

/// Archives of one component inside a container
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InspectedComponent {
    pub name: String,
    pub archives: Vec<InspectedArchive>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InspectedArchive {
    pub name: String,
    pub size: u64,
}

/// Trailer of an installer or maintenance tool
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InspectReport {
    pub path: PathBuf,
    pub marker: String,
    /// Bytes of executable code before the appended data
    pub stub_len: u64,
    pub metadata: Vec<String>,
    pub components: Vec<InspectedComponent>,
    /// Recorded operations, as descriptors
    pub operations: Vec<String>,
    pub has_resource_archive: bool,
}

/// Result of `create-installer`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OfflineReport {
    pub path: PathBuf,
    pub components: Vec<String>,
    pub archives: usize,
    pub bytes: u64,
}

/// Result of `recover`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecoveryInfo {
    /// Whether an interrupted run was found
    pub recovered: bool,
    pub operations: usize,
    pub undone: usize,
}
