//! On-disk record of an in-flight run
//!
//! The journal is rewritten after every executed operation and deleted
//! once the run commits or has been unwound. Finding one at start means the
//! previous run died half way.
//!
//! The maintenance tool is rewritten just before commit, so the journal
//! also keeps a copy of the previous tool to put back when unwinding.

use chrono::{DateTime, Utc};
use ifw_errors::{Error, FormatError, OperationError};
use ifw_operations::Operation;
use ifw_platform::filesystem::{self, atomic_write, remove_path};
use ifw_types::RunMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The maintenance tool as it was before this run rewrote it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSnapshot {
    pub path: PathBuf,
    /// Copy of the previous tool; `None` if there was no tool
    pub backup: Option<PathBuf>,
}

impl ToolSnapshot {
    /// Put the previous tool back, or delete the one this run created
    ///
    /// # Errors
    ///
    /// `BackupNotFound` if the copy has gone missing, or I/O errors.
    pub async fn restore(&self) -> Result<(), Error> {
        let Some(backup) = &self.backup else {
            return remove_path(&self.path).await;
        };
        if !filesystem::occupied(backup).await {
            return Err(OperationError::BackupNotFound {
                path: self.path.display().to_string(),
                backup: backup.display().to_string(),
            }
            .into());
        }
        remove_path(&self.path).await?;
        filesystem::move_path(backup, &self.path).await?;
        tracing::info!(path = %self.path.display(), "previous maintenance tool restored");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    /// `components.xml` as it was before the run; `None` if there was none
    pub packages: Option<String>,
    /// Executed operations in execution order
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_tool: Option<ToolSnapshot>,
    #[serde(skip)]
    path: PathBuf,
}

impl Journal {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, run_id: Uuid, mode: RunMode, packages: Option<String>) -> Self {
        Self {
            run_id,
            mode,
            started_at: Utc::now(),
            packages,
            operations: Vec::new(),
            maintenance_tool: None,
            path: path.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a leftover journal
    ///
    /// # Errors
    ///
    /// I/O errors other than a missing file, or `FormatError` for a journal
    /// that does not parse.
    pub async fn load(path: &Path) -> Result<Option<Self>, Error> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io_with_path(&e, path)),
        };
        let mut journal: Self = serde_json::from_slice(&data).map_err(|e| FormatError::InvalidContent {
            file: path.display().to_string(),
            message: e.to_string(),
        })?;
        journal.path = path.to_path_buf();
        Ok(Some(journal))
    }

    /// Record an executed operation and persist immediately
    ///
    /// # Errors
    ///
    /// Write failures.
    pub async fn record(&mut self, operation: &Operation) -> Result<(), Error> {
        self.operations.push(operation.clone());
        self.save().await
    }

    /// Replace the last recorded copy of an operation after it changed state
    ///
    /// # Errors
    ///
    /// Write failures.
    pub async fn update(&mut self, index: usize, operation: &Operation) -> Result<(), Error> {
        if let Some(slot) = self.operations.get_mut(index) {
            *slot = operation.clone();
        }
        self.save().await
    }

    /// Copy the maintenance tool at `tool` into `backup_dir` and persist
    /// that before the tool is rewritten
    ///
    /// # Errors
    ///
    /// Copy or write failures.
    pub async fn snapshot_tool(&mut self, tool: &Path, backup_dir: &Path) -> Result<(), Error> {
        let backup = if filesystem::occupied(tool).await {
            tokio::fs::create_dir_all(backup_dir)
                .await
                .map_err(|e| Error::io_with_path(&e, backup_dir))?;
            let backup = filesystem::backup_path(backup_dir, tool);
            filesystem::copy_file(tool, &backup).await?;
            Some(backup)
        } else {
            None
        };
        self.maintenance_tool = Some(ToolSnapshot {
            path: tool.to_path_buf(),
            backup,
        });
        self.save().await
    }

    /// Put back the maintenance tool recorded by [`Self::snapshot_tool`]
    pub async fn restore_tool(&self) {
        if let Some(snapshot) = &self.maintenance_tool {
            if let Err(e) = snapshot.restore().await {
                tracing::warn!(path = %snapshot.path.display(), error = %e, "could not restore maintenance tool");
            }
        }
    }

    /// # Errors
    ///
    /// Serialization or write failures.
    pub async fn save(&self) -> Result<(), Error> {
        let data = serde_json::to_vec_pretty(self)
            .map_err(|e| Error::internal(format!("cannot serialize journal: {e}")))?;
        atomic_write(&self.path, &data).await
    }

    /// # Errors
    ///
    /// Failure to delete the file.
    pub async fn remove(self) -> Result<(), Error> {
        tracing::debug!(path = %self.path.display(), "removing journal");
        remove_path(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifw_operations::{OperationKind, OperationState};

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installer.journal.json");
        let mut journal = Journal::new(&path, Uuid::new_v4(), RunMode::Install, None);

        let mut op = Operation::new(OperationKind::Mkdir, vec!["@TargetDir@/bin".to_string()])
            .for_component("app.core");
        op.state = OperationState::Executed;
        journal.record(&op).await.unwrap();

        let loaded = Journal::load(&path).await.unwrap().unwrap();
        assert_eq!(loaded.run_id, journal.run_id);
        assert_eq!(loaded.operations, vec![op]);
        assert_eq!(loaded.path(), path.as_path());

        loaded.remove().await.unwrap();
        assert!(Journal::load(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tool_snapshot_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installer.journal.json");
        let tool = dir.path().join("maintenancetool");
        let backups = dir.path().join("backup");
        std::fs::write(&tool, "previous tool").unwrap();

        let mut journal = Journal::new(&path, Uuid::new_v4(), RunMode::Update, None);
        journal.snapshot_tool(&tool, &backups).await.unwrap();
        std::fs::write(&tool, "rewritten tool").unwrap();

        let loaded = Journal::load(&path).await.unwrap().unwrap();
        assert_eq!(loaded.maintenance_tool, journal.maintenance_tool);
        loaded.restore_tool().await;
        assert_eq!(std::fs::read_to_string(&tool).unwrap(), "previous tool");
    }

    #[tokio::test]
    async fn test_tool_snapshot_without_previous_tool() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("maintenancetool");
        let mut journal = Journal::new(
            dir.path().join("installer.journal.json"),
            Uuid::new_v4(),
            RunMode::Install,
            None,
        );
        journal.snapshot_tool(&tool, &dir.path().join("backup")).await.unwrap();
        std::fs::write(&tool, "new tool").unwrap();

        journal.restore_tool().await;
        assert!(!tool.exists());
    }

    #[tokio::test]
    async fn test_corrupt_journal_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installer.journal.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();
        assert!(matches!(
            Journal::load(&path).await,
            Err(Error::Format(_))
        ));
    }
}
