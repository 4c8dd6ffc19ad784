//! Component dependency resolution errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum DependencyError {
    #[error("Dependency cycle between components detected: '{a}' and '{b}'.")]
    Cycle { a: String, b: String },

    #[error("component {component} depends on {dependency}, which is not available")]
    Unresolved {
        component: String,
        dependency: String,
    },

    #[error("component {component} requires {dependency} {constraint}, found {found}")]
    VersionMismatch {
        component: String,
        dependency: String,
        constraint: String,
        found: String,
    },

    #[error("cannot resolve all dependencies: {component} is required by {}", .dependents.join(", "))]
    StillRequired {
        component: String,
        dependents: Vec<String>,
    },

    #[error("component {component} is a forced installation and cannot be removed")]
    ForcedComponent { component: String },

    #[error("unknown component {0}")]
    UnknownComponent(String),
}

impl UserFacingError for DependencyError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::StillRequired { .. } => {
                Some("Remove the dependent components as well, or keep this one installed.")
            }
            Self::UnknownComponent(_) => Some("Run `ifw list --available` to see components."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::Cycle { .. } => "dependency.cycle",
            Self::Unresolved { .. } => "dependency.unresolved",
            Self::VersionMismatch { .. } => "dependency.version_mismatch",
            Self::StillRequired { .. } => "dependency.still_required",
            Self::ForcedComponent { .. } => "dependency.forced_component",
            Self::UnknownComponent(_) => "dependency.unknown_component",
        })
    }
}
