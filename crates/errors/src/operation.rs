//! Errors raised while executing or undoing operations

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum OperationError {
    #[error("could not backup {path}: {message}")]
    BackupFailed { path: String, message: String },

    #[error("backup {backup} of {path} does not exist")]
    BackupNotFound { path: String, backup: String },

    #[error("{operation} was never executed")]
    NotExecuted { operation: String },

    #[error("{operation} was already undone")]
    AlreadyUndone { operation: String },

    #[error("{operation} failed: {message}")]
    Failed { operation: String, message: String },

    #[error("installer value '{key}' is not set")]
    ContextValueMissing { key: String },

    #[error("script of component {component} failed: {message}")]
    ScriptFailed { component: String, message: String },
}

impl OperationError {
    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl UserFacingError for OperationError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::BackupFailed { .. } => Some("Free disk space and check write permissions."),
            Self::BackupNotFound { .. } => {
                Some("The backup was removed externally; the file cannot be restored.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::BackupFailed { .. } => "operation.backup_failed",
            Self::BackupNotFound { .. } => "operation.backup_not_found",
            Self::NotExecuted { .. } => "operation.not_executed",
            Self::AlreadyUndone { .. } => "operation.already_undone",
            Self::Failed { .. } => "operation.failed",
            Self::ContextValueMissing { .. } => "operation.context_value_missing",
            Self::ScriptFailed { .. } => "operation.script_failed",
        })
    }
}
