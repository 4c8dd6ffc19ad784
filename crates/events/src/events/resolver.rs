use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Dependency resolution events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResolverEvent {
    Started {
        requested: Vec<String>,
        mode: String,
    },

    Completed {
        install: Vec<String>,
        remove: Vec<String>,
    },

    Failed {
        failure: FailureContext,
    },
}
