//! Network-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum NetworkError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection reset while downloading {url}")]
    ConnectionReset { url: String },

    #[error("HTTP error {status} for {url}")]
    HttpError { status: u16, url: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    #[error("transfer failed: {0}")]
    TransferFailed(String),

    #[error("authentication required for {url}")]
    AuthenticationRequired { url: String },

    #[error("proxy error: {0}")]
    ProxyError(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("destination {path} is locked by another download")]
    DestinationLocked { path: String },
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::ConnectionFailed(_) | Self::ConnectionReset { .. } => {
                Some("Check your network connection and retry.")
            }
            Self::AuthenticationRequired { .. } => {
                Some("Provide valid credentials for the repository.")
            }
            Self::ProxyError(_) => Some("Check the proxy configured under [network]."),
            Self::InvalidUrl(_) | Self::UnsupportedScheme { .. } => {
                Some("Use an http, https, file or resource URL.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. }
            | Self::ConnectionFailed(_)
            | Self::ConnectionReset { .. }
            | Self::TransferFailed(_) => true,
            Self::HttpError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Timeout { .. } => "network.timeout",
            Self::ConnectionFailed(_) => "network.connection_failed",
            Self::ConnectionReset { .. } => "network.connection_reset",
            Self::HttpError { .. } => "network.http_error",
            Self::InvalidUrl(_) => "network.invalid_url",
            Self::UnsupportedScheme { .. } => "network.unsupported_scheme",
            Self::TransferFailed(_) => "network.transfer_failed",
            Self::AuthenticationRequired { .. } => "network.authentication_required",
            Self::ProxyError(_) => "network.proxy_error",
            Self::ResourceNotFound(_) => "network.resource_not_found",
            Self::DestinationLocked { .. } => "network.destination_locked",
        };
        Some(code)
    }
}
