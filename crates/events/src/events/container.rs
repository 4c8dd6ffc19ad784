use serde::{Deserialize, Serialize};

/// Binary container read and write events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContainerEvent {
    Read {
        path: String,
        components: usize,
        operations: usize,
    },

    Written {
        path: String,
        bytes: u64,
    },
}
