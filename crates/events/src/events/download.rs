use serde::{Deserialize, Serialize};

use super::FailureContext;
use crate::ProgressEvent;

/// Transfer events emitted by the downloader
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    Started {
        url: String,
        component: Option<String>,
        total_size: Option<u64>,
    },

    Progress {
        url: String,
        progress: ProgressEvent,
    },

    Completed {
        url: String,
        component: Option<String>,
        final_size: u64,
        hash: Option<String>,
    },

    Retrying {
        url: String,
        attempt: u32,
        reason: String,
    },

    HashMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    Cancelled {
        url: String,
    },

    Failed {
        url: String,
        failure: FailureContext,
    },
}
