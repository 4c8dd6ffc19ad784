//! Report type definitions for runs

use crate::{RunMode, RunStatus, Version};
use ifw_errors::Stage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub status: RunStatus,
    /// Components that were installed
    pub installed: Vec<ComponentChange>,
    /// Components that were replaced by a newer version
    pub updated: Vec<ComponentChange>,
    /// Components that were removed
    pub removed: Vec<ComponentChange>,
    /// Number of operations executed and kept
    pub operations: usize,
    pub failure: Option<FailureSummary>,
    /// Total execution time
    pub duration_ms: u64,
}

impl RunReport {
    #[must_use]
    pub fn new(run_id: Uuid, mode: RunMode) -> Self {
        Self {
            run_id,
            mode,
            status: RunStatus::Finished,
            installed: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            operations: 0,
            failure: None,
            duration_ms: 0,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Finished
    }
}

/// Component change for reports
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentChange {
    pub name: String,
    pub from_version: Option<Version>,
    pub to_version: Option<Version>,
}

/// Where and why a run stopped
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FailureSummary {
    #[serde(with = "stage_str")]
    pub stage: Stage,
    pub component: Option<String>,
    pub operation: Option<String>,
    pub message: String,
    pub code: Option<String>,
}

impl std::fmt::Display for FailureSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} stage failed", self.stage)?;
        if let Some(component) = &self.component {
            write!(f, " in component {component}")?;
        }
        if let Some(operation) = &self.operation {
            write!(f, " at {operation}")?;
        }
        write!(f, ": {}", self.message)
    }
}

mod stage_str {
    use ifw_errors::Stage;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(stage: &Stage, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&stage.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Stage, D::Error> {
        match String::deserialize(d)?.as_str() {
            "fetch" => Ok(Stage::Fetch),
            "resolve" => Ok(Stage::Resolve),
            "apply" => Ok(Stage::Apply),
            "commit" => Ok(Stage::Commit),
            other => Err(serde::de::Error::custom(format!("unknown stage {other}"))),
        }
    }
}
