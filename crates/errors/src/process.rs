//! External process errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ProcessError {
    #[error("failed to launch '{program}': {message}")]
    LaunchFailed { program: String, message: String },

    #[error("Running '{program}' resulted in a crash.")]
    Crashed { program: String, signal: Option<i32> },

    #[error("'{program}' exited with code {code}: {stderr}")]
    NonZeroExit {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("program '{program}' does not exist")]
    NotExecutable { program: String },
}

impl UserFacingError for ProcessError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::LaunchFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::LaunchFailed { .. } => "process.launch_failed",
            Self::Crashed { .. } => "process.crashed",
            Self::NonZeroExit { .. } => "process.non_zero_exit",
            Self::NotExecutable { .. } => "process.not_executable",
        })
    }
}
