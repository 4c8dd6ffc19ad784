//! Run modes and orchestrator states

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a run is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Install,
    Update,
    Uninstall,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Uninstall => "uninstall",
        })
    }
}

/// Orchestrator state machine
///
/// `Idle -> MetadataFetching -> Resolving -> ReadyToApply -> Applying`, then
/// one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    MetadataFetching,
    Resolving,
    ReadyToApply,
    Applying,
    Finished,
    Aborted,
    Failed,
}

impl RunState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Aborted | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use RunState::{
            Aborted, Applying, Failed, Finished, Idle, MetadataFetching, ReadyToApply, Resolving,
        };
        match (self, next) {
            (Idle, MetadataFetching)
            | (MetadataFetching, Resolving)
            | (Resolving, ReadyToApply)
            | (ReadyToApply, Applying)
            | (Applying, Finished) => true,
            (from, Aborted | Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::MetadataFetching => "metadata_fetching",
            Self::Resolving => "resolving",
            Self::ReadyToApply => "ready_to_apply",
            Self::Applying => "applying",
            Self::Finished => "finished",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        })
    }
}

/// Externally visible outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Finished,
    Canceled,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Finished => "finished",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert!(RunState::Idle.can_transition_to(RunState::MetadataFetching));
        assert!(RunState::Applying.can_transition_to(RunState::Finished));
        assert!(RunState::Resolving.can_transition_to(RunState::Failed));
        assert!(!RunState::Idle.can_transition_to(RunState::Applying));
        assert!(!RunState::Finished.can_transition_to(RunState::Failed));
        assert!(!RunState::Resolving.can_transition_to(RunState::Finished));
    }
}
