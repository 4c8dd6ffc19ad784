#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! High-level operations orchestration for ifw
//!
//! This crate serves as the orchestration layer between the CLI and the
//! engine crates. Queries are implemented here, while runs delegate to
//! the install crate.

mod context;
mod large_ops;
mod maintenance;
mod query;
mod small_ops;
mod types;

pub use context::{OpsContextBuilder, OpsCtx};
pub use types::{
    ComponentListing, ComponentStatus, InspectReport, InspectedArchive, InspectedComponent,
    OfflineReport, RecoveryInfo,
};

// Re-export operation functions
pub use large_ops::{create_installer, install, uninstall, update};
pub use small_ops::{inspect, list_components, recover};

use ifw_errors::Error;
use ifw_types::RunReport;

/// Operation result that can be serialized for CLI output
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OperationResult {
    /// Outcome of install, update or uninstall
    Run(RunReport),
    /// Component list
    ComponentList(Vec<ComponentListing>),
    /// Container description
    Inspect(InspectReport),
    /// Offline installer that was written
    OfflineInstaller(OfflineReport),
    /// Crash recovery outcome
    Recovery(RecoveryInfo),
    /// Generic success message
    Success(String),
}

impl OperationResult {
    /// Convert to JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::internal(format!("cannot serialize result: {e}")))
    }

    /// Check if this is a success result
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            OperationResult::Run(report) => report.is_success(),
            OperationResult::ComponentList(_)
            | OperationResult::Inspect(_)
            | OperationResult::OfflineInstaller(_)
            | OperationResult::Recovery(_)
            | OperationResult::Success(_) => true,
        }
    }
}
