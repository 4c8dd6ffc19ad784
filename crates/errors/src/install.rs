//! Orchestrator errors

use std::borrow::Cow;
use std::fmt;

use crate::UserFacingError;
use thiserror::Error;

/// Run stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    Fetch,
    Resolve,
    Apply,
    Commit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetch",
            Self::Resolve => "resolve",
            Self::Apply => "apply",
            Self::Commit => "commit",
        })
    }
}

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum InstallError {
    #[error("Could not find any update source information.")]
    NoUpdateSources { failures: Vec<String> },

    #[error("Could not add temporary update source information: {source_url}: {message}")]
    SourceFailed { source_url: String, message: String },

    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Error during installation process ({component}):\n{operation} failed: {message}")]
    OperationFailed {
        component: String,
        operation: String,
        index: usize,
        message: String,
    },

    #[error("Installation canceled by user")]
    Aborted,

    #[error("component {0} not found")]
    ComponentNotFound(String),

    #[error("crash recovery failed: {message}")]
    RecoveryFailed { message: String },

    #[error("Could not write uninstaller to {path}: {message}")]
    UninstallerWriteFailed { path: String, message: String },

    #[error("archive {archive} of component {component} was not downloaded")]
    MissingArchive { component: String, archive: String },

    #[error("no maintenance tool found at {path}")]
    NoMaintenanceTool { path: String },
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NoUpdateSources { .. } | Self::SourceFailed { .. } => {
                Some("Check the configured update sources and your network connection.")
            }
            Self::RecoveryFailed { .. } => {
                Some("Inspect the journal file in the target directory and remove it manually.")
            }
            Self::NoMaintenanceTool { .. } => {
                Some("Pass the installation directory with --target.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::NoUpdateSources { .. } | Self::SourceFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::NoUpdateSources { .. } => "install.no_update_sources",
            Self::SourceFailed { .. } => "install.source_failed",
            Self::InvalidTransition { .. } => "install.invalid_transition",
            Self::OperationFailed { .. } => "install.operation_failed",
            Self::Aborted => "install.aborted",
            Self::ComponentNotFound(_) => "install.component_not_found",
            Self::RecoveryFailed { .. } => "install.recovery_failed",
            Self::UninstallerWriteFailed { .. } => "install.uninstaller_write_failed",
            Self::MissingArchive { .. } => "install.missing_archive",
            Self::NoMaintenanceTool { .. } => "install.no_maintenance_tool",
        })
    }
}
