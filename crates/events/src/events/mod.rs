use serde::{Deserialize, Serialize};

use crate::EventSource;
use ifw_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod container;
pub mod download;
pub mod general;
pub mod lifecycle;
pub mod operation;
pub mod resolver;

pub use container::*;
pub use download::*;
pub use general::*;
pub use lifecycle::*;
pub use operation::*;
pub use resolver::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    General(GeneralEvent),
    Download(DownloadEvent),
    Operation(OperationEvent),
    Resolver(ResolverEvent),
    Lifecycle(LifecycleEvent),
    Container(ContainerEvent),
}

impl AppEvent {
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Download(_) => EventSource::DOWNLOAD,
            Self::Operation(_) => EventSource::OPERATION,
            Self::Resolver(_) => EventSource::RESOLVER,
            Self::Lifecycle(_) => EventSource::LIFECYCLE,
            Self::Container(_) => EventSource::CONTAINER,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::Error { .. } | GeneralEvent::CommandFailed { .. })
            | Self::Download(DownloadEvent::Failed { .. })
            | Self::Operation(OperationEvent::Failed { .. } | OperationEvent::UndoFailed { .. })
            | Self::Resolver(ResolverEvent::Failed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Download(
                DownloadEvent::Retrying { .. } | DownloadEvent::HashMismatch { .. },
            )
            | Self::Lifecycle(LifecycleEvent::SourceFailed { .. }) => Level::WARN,

            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Download(DownloadEvent::Progress { .. })
            | Self::Operation(
                OperationEvent::Executing { .. } | OperationEvent::Undoing { .. },
            )
            | Self::Lifecycle(LifecycleEvent::StateChanged { .. }) => Level::DEBUG,

            _ => Level::INFO,
        }
    }
}
