//! Installer configuration errors
//!
//! Raised while reading `config.toml`, applying `IFW_*` overrides or
//! saving the file back.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ConfigError {
    /// The file named by `--config`, or the platform config directory, is missing
    #[error("installer configuration not found: {path}")]
    NotFound { path: String },

    /// Settings that parse but cannot be used together
    #[error("unusable installer configuration: {message}")]
    Invalid { message: String },

    #[error("{path} is not valid TOML: {message}")]
    ParseError { path: String, message: String },

    /// `field` is a TOML key or the `IFW_*` variable that carried the value
    #[error("{field} does not accept '{value}'")]
    InvalidValue { field: String, value: String },

    #[error("cannot save installer configuration to {path}: {error}")]
    WriteError { path: String, error: String },
}

impl UserFacingError for ConfigError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => {
                Some("Point --config at an existing config.toml, or drop the flag to use defaults.")
            }
            Self::ParseError { .. } => Some("Correct the TOML syntax in config.toml."),
            Self::InvalidValue { field, .. } if field.starts_with("IFW_") => {
                Some("Unset the environment variable or give it one of the documented values.")
            }
            Self::InvalidValue { .. } | Self::Invalid { .. } => {
                Some("Adjust the setting in config.toml and run the command again.")
            }
            Self::WriteError { .. } => Some("Check that the configuration directory is writable."),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::NotFound { .. } => "config.not_found",
            Self::Invalid { .. } => "config.invalid",
            Self::ParseError { .. } => "config.parse_error",
            Self::InvalidValue { .. } => "config.invalid_value",
            Self::WriteError { .. } => "config.write_error",
        })
    }
}
