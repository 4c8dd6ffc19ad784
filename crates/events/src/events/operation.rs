use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Operation execution and undo events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperationEvent {
    Executing {
        component: Option<String>,
        operation: String,
        index: usize,
    },

    Executed {
        component: Option<String>,
        operation: String,
    },

    Failed {
        component: Option<String>,
        operation: String,
        failure: FailureContext,
    },

    Undoing {
        component: Option<String>,
        operation: String,
    },

    Undone {
        component: Option<String>,
        operation: String,
    },

    /// Undo failures are reported and skipped so the rest of the log still unwinds
    UndoFailed {
        component: Option<String>,
        operation: String,
        failure: FailureContext,
    },

    Committed {
        count: usize,
    },
}
