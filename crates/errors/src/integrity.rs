//! Payload integrity errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum IntegrityError {
    #[error("hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("invalid hash '{value}': {message}")]
    InvalidHash { value: String, message: String },
}

impl UserFacingError for IntegrityError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::HashMismatch { .. } => {
                Some("The downloaded file was damaged in transit; retry the download.")
            }
            Self::InvalidHash { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::HashMismatch { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::HashMismatch { .. } => "integrity.hash_mismatch",
            Self::InvalidHash { .. } => "integrity.invalid_hash",
        })
    }
}
