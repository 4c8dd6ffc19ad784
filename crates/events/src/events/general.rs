//! Events outside the run lifecycle: degraded-mode warnings, errors the
//! CLI reports before a run starts, and the bracket around each `ifw`
//! subcommand

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    /// Something was skipped but the command carries on, such as a
    /// repository skipped under the `any` fetch policy
    Warning {
        message: String,
        /// The error that was downgraded
        context: Option<String>,
    },

    Error {
        message: String,
        details: Option<String>,
    },

    DebugLog {
        message: String,
    },

    /// Subcommand line as typed, e.g. `install app.core`
    CommandStarted {
        command: String,
    },

    /// `success` is false when the run report carries a failure
    CommandCompleted {
        command: String,
        success: bool,
    },

    /// The subcommand returned an error instead of a run report
    CommandFailed {
        command: String,
        error: String,
    },
}

impl GeneralEvent {
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: None,
        }
    }

    /// Warning that keeps the error it replaced
    pub fn warning_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            details: None,
        }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::DebugLog {
            message: message.into(),
        }
    }
}
