//! Operation argument validation errors

use std::borrow::Cow;
use std::fmt;

use crate::UserFacingError;
use thiserror::Error;

/// Accepted argument count of an operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Arity {
    Exactly(usize),
    /// Same as `Exactly`, spelled out as "exactly N" in messages
    Only(usize),
    Range(usize, usize),
    AtLeast(usize),
    Either(usize, usize),
}

impl Arity {
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) | Self::Only(n) => count == n,
            Self::Range(min, max) => (min..=max).contains(&count),
            Self::AtLeast(min) => count >= min,
            Self::Either(a, b) => count == a || count == b,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "{n}"),
            Self::Only(n) => write!(f, "exactly {n}"),
            Self::Range(min, max) => write!(f, "{min} to {max}"),
            Self::AtLeast(min) => write!(f, "at least {min}"),
            Self::Either(a, b) => write!(f, "{a} or {b}"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ValidationError {
    #[error("Invalid arguments in {operation}: {given} arguments given, {expected} expected.")]
    InvalidArgumentCount {
        operation: String,
        given: usize,
        expected: Arity,
    },

    #[error("unknown operation '{name}'")]
    UnknownOperation { name: String },

    #[error("invalid argument for {operation}: {message}")]
    InvalidArgument { operation: String, message: String },
}

impl UserFacingError for ValidationError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        Some("The component metadata declares an invalid operation; contact its maintainer.")
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::InvalidArgumentCount { .. } => "validation.invalid_argument_count",
            Self::UnknownOperation { .. } => "validation.unknown_operation",
            Self::InvalidArgument { .. } => "validation.invalid_argument",
        })
    }
}
