#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Installation runs for ifw
//!
//! This crate drives a run from metadata fetching through resolution to
//! applying operations as one transaction, and keeps the installed state
//! (`components.xml` and the maintenance tool) in step with it.

#[macro_use]
mod macros;
mod api;
mod installer;
mod journal;
mod maintenance;
mod metadata;
mod offline;
mod run;
mod transaction;

pub use installer::{Installer, RecoveryReport};
pub use journal::{Journal, ToolSnapshot};
pub use maintenance::MaintenanceTool;
pub use metadata::{fetch_metadata, FetchedMetadata};
pub use offline::{create_installer, EmbeddedRepository, OfflineInstaller};

// Re-export the public API surface from api module
pub use api::config::InstallConfig;
pub use api::context::{InstallContext, UninstallContext, UpdateContext};

// Re-export EventSender for use by macros and contexts
pub use ifw_events::EventSender;
