//! Privilege elevation errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum AuthorizationError {
    #[error("elevation was denied: {reason}")]
    ElevationDenied { reason: String },

    #[error("elevated rights were lost before {operation}")]
    ElevationLost { operation: String },

    #[error("{operation} requires elevated rights")]
    NotElevated { operation: String },
}

impl UserFacingError for AuthorizationError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        Some("Rerun the installer with administrator rights.")
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::ElevationDenied { .. } => "authorization.denied",
            Self::ElevationLost { .. } => "authorization.lost",
            Self::NotElevated { .. } => "authorization.not_elevated",
        })
    }
}
