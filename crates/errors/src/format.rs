//! Binary container and metadata format errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum FormatError {
    #[error("No marker found, stopped after {scanned} bytes.")]
    MarkerNotFound { scanned: u64 },

    #[error("Could not seek to binary layout section.")]
    LayoutSeekFailed,

    #[error("Could not seek to metadata index.")]
    MetadataIndexSeekFailed { offset: i64 },

    #[error("Could not seek to operation list.")]
    OperationListSeekFailed { offset: i64 },

    #[error("Could not seek to component index information.")]
    ComponentIndexSeekFailed { offset: i64 },

    #[error("segment ({offset}, {length}) lies outside the data block of {block_size} bytes")]
    SegmentOutOfBounds {
        offset: i64,
        length: i64,
        block_size: i64,
    },

    #[error("truncated {section}: {message}")]
    Truncated { section: String, message: String },

    #[error("unexpected magic marker {marker:#x}")]
    UnexpectedMarker { marker: i64 },

    #[error("XML error in {file}: {message}")]
    Xml { file: String, message: String },

    #[error("{file}: {message}")]
    InvalidContent { file: String, message: String },

    #[error("Root element {found} unexpected, should be \"{expected}\".")]
    UnexpectedRoot { found: String, expected: String },

    #[error("invalid operation descriptor '{input}': {message}")]
    InvalidOperationDescriptor { input: String, message: String },

    #[error("invalid version '{input}'")]
    InvalidVersion { input: String },
}

impl UserFacingError for FormatError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MarkerNotFound { .. }
            | Self::LayoutSeekFailed
            | Self::MetadataIndexSeekFailed { .. }
            | Self::OperationListSeekFailed { .. }
            | Self::ComponentIndexSeekFailed { .. }
            | Self::SegmentOutOfBounds { .. }
            | Self::Truncated { .. }
            | Self::UnexpectedMarker { .. } => {
                Some("The installer binary is corrupt or incomplete; download it again.")
            }
            Self::Xml { .. } | Self::InvalidContent { .. } | Self::UnexpectedRoot { .. } => {
                Some("The repository metadata is malformed; contact the repository maintainer.")
            }
            Self::InvalidOperationDescriptor { .. } | Self::InvalidVersion { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::MarkerNotFound { .. } => "format.marker_not_found",
            Self::LayoutSeekFailed => "format.layout_seek_failed",
            Self::MetadataIndexSeekFailed { .. } => "format.metadata_index_seek_failed",
            Self::OperationListSeekFailed { .. } => "format.operation_list_seek_failed",
            Self::ComponentIndexSeekFailed { .. } => "format.component_index_seek_failed",
            Self::SegmentOutOfBounds { .. } => "format.segment_out_of_bounds",
            Self::Truncated { .. } => "format.truncated",
            Self::UnexpectedMarker { .. } => "format.unexpected_marker",
            Self::Xml { .. } => "format.xml",
            Self::InvalidContent { .. } => "format.invalid_content",
            Self::UnexpectedRoot { .. } => "format.unexpected_root",
            Self::InvalidOperationDescriptor { .. } => "format.invalid_operation_descriptor",
            Self::InvalidVersion { .. } => "format.invalid_version",
        };
        Some(code)
    }
}
