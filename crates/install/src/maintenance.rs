//! The maintenance tool: the record of performed operations
//!
//! Every committed operation is stored in the tool's container trailer as
//! an operation record whose data is the JSON form of the operation,
//! including its undo payload. Uninstalling a component replays those
//! records backwards.

use ifw_container::{BinaryContent, ContainerWriter, Marker, OperationRecord};
use ifw_errors::{Error, FormatError, InstallError};
use ifw_operations::{Operation, OperationState};
use ifw_platform::filesystem::remove_path;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct MaintenanceTool {
    path: PathBuf,
    operations: Vec<Operation>,
}

impl MaintenanceTool {
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            operations: Vec::new(),
        }
    }

    /// Read the operations recorded in an existing tool
    ///
    /// # Errors
    ///
    /// `NoMaintenanceTool` if nothing exists at `path`, container errors for
    /// a file without a valid trailer and `FormatError` for records that do
    /// not decode.
    pub async fn open(path: &Path) -> Result<Self, Error> {
        if !ifw_platform::filesystem::occupied(path).await {
            return Err(InstallError::NoMaintenanceTool {
                path: path.display().to_string(),
            }
            .into());
        }
        let owned = path.to_path_buf();
        let records = tokio::task::spawn_blocking(move || {
            BinaryContent::open(&owned).map(|content| content.operations().to_vec())
        })
        .await
        .map_err(|e| Error::internal(format!("maintenance tool read task failed: {e}")))??;

        let operations = records
            .iter()
            .map(|record| decode(record, path))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(path = %path.display(), operations = operations.len(), "read maintenance tool");
        Ok(Self {
            path: path.to_path_buf(),
            operations,
        })
    }

    /// Open the tool if there is one, otherwise start empty
    ///
    /// # Errors
    ///
    /// See [`Self::open`]; a missing tool is not an error.
    pub async fn open_or_empty(path: &Path) -> Result<Self, Error> {
        match Self::open(path).await {
            Err(Error::Install(InstallError::NoMaintenanceTool { .. })) => Ok(Self::empty(path)),
            other => other,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Components that still have recorded operations
    #[must_use]
    pub fn components(&self) -> BTreeSet<String> {
        self.operations
            .iter()
            .filter_map(|op| op.component.clone())
            .collect()
    }

    /// Remove and return the operations of `component` in execution order
    pub fn take_component(&mut self, component: &str) -> Vec<Operation> {
        let (taken, kept) = std::mem::take(&mut self.operations)
            .into_iter()
            .partition(|op| op.component.as_deref() == Some(component));
        self.operations = kept;
        taken
    }

    /// Append operations that were just committed
    ///
    /// Backup references are dropped: backups do not outlive a commit.
    pub fn record<I>(&mut self, operations: I)
    where
        I: IntoIterator<Item = Operation>,
    {
        self.operations.extend(operations.into_iter().map(|mut op| {
            if let Some(undo) = op.undo.as_mut() {
                undo.forget_backups();
            }
            op.backup_files.clear();
            op.state = OperationState::Committed;
            op
        }));
    }

    /// Write the tool atomically
    ///
    /// An existing tool keeps its executable part. Otherwise the executable
    /// part comes from `stub` (without any trailer it carries), or the tool
    /// becomes a plain data file when there is no stub.
    ///
    /// # Errors
    ///
    /// `UninstallerWriteFailed` wrapping whatever went wrong.
    pub async fn write(&self, stub: Option<&Path>) -> Result<u64, Error> {
        let records = self
            .operations
            .iter()
            .map(|op| {
                serde_json::to_vec(op)
                    .map(|data| OperationRecord {
                        name: op.name().to_string(),
                        data,
                    })
                    .map_err(|e| Error::internal(format!("cannot encode {op}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let path = self.path.clone();
        let stub = stub.map(Path::to_path_buf);
        let written = tokio::task::spawn_blocking(move || {
            let mut writer = writer_for(&path, stub.as_deref())?;
            writer.set_operations(records);
            let written = writer.write(&path)?;
            crate::offline::make_executable(&path)?;
            Ok::<_, Error>(written)
        })
        .await
        .map_err(|e| Error::internal(format!("maintenance tool write task failed: {e}")))?
        .map_err(|e| InstallError::UninstallerWriteFailed {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        tracing::info!(path = %self.path.display(), operations = self.operations.len(), bytes = written, "maintenance tool written");
        Ok(written)
    }

    /// Delete the tool once nothing is installed any more
    ///
    /// # Errors
    ///
    /// Failure to delete the file.
    pub async fn remove(self) -> Result<(), Error> {
        remove_path(&self.path).await
    }
}

fn writer_for(path: &Path, stub: Option<&Path>) -> Result<ContainerWriter, Error> {
    if path.exists() {
        if let Ok(mut existing) = BinaryContent::open(path) {
            return ContainerWriter::from_existing(&mut existing, Marker::PackageManager);
        }
    }
    Ok(match stub {
        Some(stub) => match BinaryContent::open(stub) {
            Ok(installer) => {
                ContainerWriter::new(stub, Marker::PackageManager).stub_len(installer.stub_len())
            }
            Err(_) => ContainerWriter::new(stub, Marker::PackageManager),
        },
        None => ContainerWriter::data_file(Marker::PackageManager),
    })
}

fn decode(record: &OperationRecord, path: &Path) -> Result<Operation, Error> {
    serde_json::from_slice(&record.data).map_err(|e| {
        FormatError::InvalidContent {
            file: path.display().to_string(),
            message: format!("operation record {}: {e}", record.name),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifw_operations::{OperationKind, UndoState};

    fn executed(component: &str, dir: &str) -> Operation {
        let mut op = Operation::new(OperationKind::Mkdir, vec![dir.to_string()]).for_component(component);
        op.state = OperationState::Executed;
        op.undo = Some(UndoState::Mkdir {
            created: vec![PathBuf::from(dir)],
        });
        op
    }

    #[tokio::test]
    async fn test_write_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maintenancetool");

        let mut tool = MaintenanceTool::empty(&path);
        tool.record([executed("app.runtime", "/opt/a"), executed("app.core", "/opt/b")]);
        tool.write(None).await.unwrap();

        let mut reopened = MaintenanceTool::open(&path).await.unwrap();
        assert_eq!(reopened.operations().len(), 2);
        assert!(reopened
            .operations()
            .iter()
            .all(|op| op.state == OperationState::Committed));
        assert_eq!(
            reopened.components().into_iter().collect::<Vec<_>>(),
            vec!["app.core".to_string(), "app.runtime".to_string()]
        );

        let taken = reopened.take_component("app.core");
        assert_eq!(taken.len(), 1);
        reopened.write(None).await.unwrap();
        assert_eq!(MaintenanceTool::open(&path).await.unwrap().operations().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maintenancetool");
        assert!(matches!(
            MaintenanceTool::open(&path).await,
            Err(Error::Install(InstallError::NoMaintenanceTool { .. }))
        ));
        assert!(MaintenanceTool::open_or_empty(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stub_keeps_executable_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("stub");
        std::fs::write(&stub, b"#!/bin/sh\nexit 0\n").unwrap();
        let path = dir.path().join("maintenancetool");

        let mut tool = MaintenanceTool::empty(&path);
        tool.record([executed("app.core", "/opt/b")]);
        tool.write(Some(&stub)).await.unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"#!/bin/sh\nexit 0\n"));
        let content = BinaryContent::open(&path).unwrap();
        assert_eq!(content.stub_len(), 17);
        assert_eq!(content.operations().len(), 1);
    }
}
