use ifw_types::{RunState, RunStatus, Version};
use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Orchestrator lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LifecycleEvent {
    StateChanged {
        from: RunState,
        to: RunState,
    },

    SourceFailed {
        url: String,
        failure: FailureContext,
    },

    MetadataFetched {
        sources: usize,
        failed_sources: usize,
        components: usize,
    },

    ComponentInstalling {
        name: String,
        version: Version,
    },

    ComponentInstalled {
        name: String,
        version: Version,
    },

    ComponentRemoved {
        name: String,
    },

    RecoveryStarted {
        operations: usize,
    },

    RecoveryCompleted {
        undone: usize,
    },

    UninstallerWritten {
        path: String,
    },

    Finished {
        status: RunStatus,
    },
}
