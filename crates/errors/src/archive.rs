//! Archive service error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ArchiveError {
    #[error("could not open archive {path}: {message}")]
    CouldNotOpen { path: String, message: String },

    #[error("could not create folder {path}: {message}")]
    CouldNotCreateFolder { path: String, message: String },

    #[error("could not retrieve property of entry {index} in {archive}")]
    PropertyRetrievalFailed { archive: String, index: usize },

    #[error("unknown exception caught ({code}): {message}")]
    UnknownException { code: String, message: String },

    #[error("entry '{entry}' would be extracted outside of {destination}")]
    PathTraversal { entry: String, destination: String },

    #[error("cannot create symlink {path}: the path is already occupied")]
    SymlinkAlreadyExists { path: String },

    #[error("archive {path} is corrupt: {message}")]
    Corrupt { path: String, message: String },

    #[error("unsupported archive entry type for '{entry}'")]
    UnsupportedEntry { entry: String },
}

impl UserFacingError for ArchiveError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::CouldNotOpen { .. } | Self::Corrupt { .. } => {
                Some("The archive could not be read; download it again.")
            }
            Self::CouldNotCreateFolder { .. } => {
                Some("Check that the target directory is writable.")
            }
            Self::PathTraversal { .. } => {
                Some("The archive contains unsafe paths and was rejected.")
            }
            Self::SymlinkAlreadyExists { .. } => {
                Some("Remove the existing file at the link location and retry.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::CouldNotOpen { .. } => "archive.could_not_open",
            Self::CouldNotCreateFolder { .. } => "archive.could_not_create_folder",
            Self::PropertyRetrievalFailed { .. } => "archive.property_retrieval_failed",
            Self::UnknownException { .. } => "archive.unknown_exception",
            Self::PathTraversal { .. } => "archive.path_traversal",
            Self::SymlinkAlreadyExists { .. } => "archive.symlink_already_exists",
            Self::Corrupt { .. } => "archive.corrupt",
            Self::UnsupportedEntry { .. } => "archive.unsupported_entry",
        };
        Some(code)
    }
}
