#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the ifw installer engine
//!
//! Errors are grouped by domain. Every domain enum is `Clone` so failures can
//! be stored in reports and forwarded through event channels.

use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;

pub mod archive;
pub mod authorization;
pub mod config;
pub mod dependency;
pub mod format;
pub mod install;
pub mod integrity;
pub mod network;
pub mod operation;
pub mod process;
pub mod validation;

pub use archive::ArchiveError;
pub use authorization::AuthorizationError;
pub use config::ConfigError;
pub use dependency::DependencyError;
pub use format::FormatError;
pub use install::{InstallError, Stage};
pub use integrity::IntegrityError;
pub use network::NetworkError;
pub use operation::OperationError;
pub use process::ProcessError;
pub use validation::{Arity, ValidationError};

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("operation error: {0}")]
    Operation(#[from] OperationError),

    #[error("dependency error: {0}")]
    Dependency(#[from] DependencyError),

    #[error("authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("process error: {0}")]
    Process(#[from] ProcessError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("install error: {0}")]
    Install(#[from] InstallError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {message}{}", .path.as_ref().map(|p| format!(" ({})", p.display())).unwrap_or_default())]
    Io {
        #[cfg_attr(feature = "serde", serde(with = "io_kind_as_str"))]
        kind: std::io::ErrorKind,
        message: String,
        #[cfg_attr(feature = "serde", serde(with = "opt_path_buf"))]
        path: Option<PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// Returns `true` for a cooperative cancellation rather than a failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Install(InstallError::Aborted))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

/// Result type alias for ifw operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

macro_rules! delegate {
    ($self:ident, $err:ident => $body:expr, $($other:pat => $fallback:expr),* $(,)?) => {
        match $self {
            Error::Format($err) => $body,
            Error::Archive($err) => $body,
            Error::Network($err) => $body,
            Error::Integrity($err) => $body,
            Error::Validation($err) => $body,
            Error::Operation($err) => $body,
            Error::Dependency($err) => $body,
            Error::Authorization($err) => $body,
            Error::Process($err) => $body,
            Error::Config($err) => $body,
            Error::Install($err) => $body,
            $($other => $fallback),*
        }
    };
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        delegate!(self, err => err.user_message(),
            Error::Io { .. } | Error::Internal(_) | Error::Cancelled => Cow::Owned(self.to_string()),
        )
    }

    fn user_hint(&self) -> Option<&'static str> {
        delegate!(self, err => err.user_hint(),
            Error::Io { kind: std::io::ErrorKind::PermissionDenied, .. } => {
                Some("Check the permissions of the path or rerun with elevated rights.")
            },
            Error::Io { .. } | Error::Internal(_) => None,
            Error::Cancelled => Some("The run was cancelled; no changes were kept."),
        )
    }

    fn is_retryable(&self) -> bool {
        delegate!(self, err => err.is_retryable(),
            Error::Io { kind, .. } => matches!(
                kind,
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            ),
            Error::Internal(_) | Error::Cancelled => false,
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        delegate!(self, err => err.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Cancelled => Some("error.cancelled"),
            Error::Io { .. } => Some("error.io"),
        )
    }
}

// Serde helper modules for optional path and io::ErrorKind as string
#[cfg(feature = "serde")]
mod io_kind_as_str {
    use serde::{Deserialize, Deserializer, Serializer};
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S>(kind: &std::io::ErrorKind, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&format!("{kind:?}"))
    }
    pub fn deserialize<'de, D>(deserializer: D) -> Result<std::io::ErrorKind, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "NotFound" => std::io::ErrorKind::NotFound,
            "PermissionDenied" => std::io::ErrorKind::PermissionDenied,
            "AlreadyExists" => std::io::ErrorKind::AlreadyExists,
            "InvalidInput" => std::io::ErrorKind::InvalidInput,
            "InvalidData" => std::io::ErrorKind::InvalidData,
            "TimedOut" => std::io::ErrorKind::TimedOut,
            "Interrupted" => std::io::ErrorKind::Interrupted,
            "UnexpectedEof" => std::io::ErrorKind::UnexpectedEof,
            "StorageFull" => std::io::ErrorKind::StorageFull,
            _ => std::io::ErrorKind::Other,
        })
    }
}

#[cfg(feature = "serde")]
mod opt_path_buf {
    use serde::{Deserialize, Deserializer, Serializer};
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(path: &Option<std::path::PathBuf>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match path {
            Some(pb) => s.serialize_some(&pb.display().to_string()),
            None => s.serialize_none(),
        }
    }
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<std::path::PathBuf>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;
        Ok(opt.map(std::path::PathBuf::from))
    }
}
