//! Operation records and their undo payloads

use crate::kind::OperationKind;
use ifw_types::OperationDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Value key that marks an operation as needing elevated rights
pub const ADMIN_VALUE: &str = "admin";

/// Lifecycle of a single operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Registered,
    Validated,
    Executed,
    Undone,
    Committed,
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Registered => "registered",
            Self::Validated => "validated",
            Self::Executed => "executed",
            Self::Undone => "undone",
            Self::Committed => "committed",
        };
        f.write_str(s)
    }
}

/// A file saved before it was overwritten or deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub original: PathBuf,
    pub backup: PathBuf,
}

/// What `undo` needs to reverse one executed operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UndoState {
    /// A file was written at `path`; `backup` holds what was there before
    RestoreFile {
        path: PathBuf,
        backup: Option<PathBuf>,
        /// Parent directories created for `path`, outermost first
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        created_dirs: Vec<PathBuf>,
    },
    Move {
        source: PathBuf,
        target: PathBuf,
        backup: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        created_dirs: Vec<PathBuf>,
    },
    Delete {
        path: PathBuf,
        backup: Option<PathBuf>,
    },
    /// Directories created, outermost first
    Mkdir {
        created: Vec<PathBuf>,
    },
    Rmdir {
        path: PathBuf,
    },
    Link {
        link: PathBuf,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        created_dirs: Vec<PathBuf>,
    },
    /// Files and directories created by a multi-file operation, plus the
    /// files they displaced
    FileSet {
        files: Vec<PathBuf>,
        dirs: Vec<PathBuf>,
        backups: Vec<BackupEntry>,
    },
    Environment {
        name: String,
        previous: Option<String>,
        /// Persisted definition file, if the variable was made permanent
        file: Option<PathBuf>,
        backup: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        created_dirs: Vec<PathBuf>,
    },
    Setting {
        file: PathBuf,
        key: String,
        value: String,
        previous: Option<String>,
        /// Snapshot of the whole settings file, dropped on commit
        #[serde(default)]
        backup: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        created_dirs: Vec<PathBuf>,
    },
    Execute {
        undo_command: Option<Vec<String>>,
        working_dir: Option<PathBuf>,
    },
    ContextValue {
        key: String,
        previous: Option<String>,
    },
    Custom {
        data: serde_json::Value,
    },
}

impl UndoState {
    /// Backups this state would restore
    #[must_use]
    pub fn backups(&self) -> Vec<BackupEntry> {
        let entry = |original: &PathBuf, backup: &Option<PathBuf>| -> Vec<BackupEntry> {
            backup
                .iter()
                .map(|b| BackupEntry {
                    original: original.clone(),
                    backup: b.clone(),
                })
                .collect()
        };
        match self {
            Self::RestoreFile { path, backup, .. } | Self::Delete { path, backup } => {
                entry(path, backup)
            }
            Self::Move {
                target: file,
                backup,
                ..
            }
            | Self::Setting { file, backup, .. } => entry(file, backup),
            Self::Environment {
                file: Some(file),
                backup,
                ..
            } => entry(file, backup),
            Self::FileSet { backups, .. } => backups.clone(),
            _ => Vec::new(),
        }
    }

    /// Drop references to backups once they are deleted on commit
    pub fn forget_backups(&mut self) {
        match self {
            Self::RestoreFile { backup, .. }
            | Self::Move { backup, .. }
            | Self::Delete { backup, .. }
            | Self::Environment { backup, .. }
            | Self::Setting { backup, .. } => *backup = None,
            Self::FileSet { backups, .. } => backups.clear(),
            _ => {}
        }
    }
}

/// One step of a component's installation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    /// Raw arguments; `@Key@` placeholders are substituted at execute time
    pub arguments: Vec<String>,
    pub component: Option<String>,
    pub requires_elevation: bool,
    pub state: OperationState,
    #[serde(default)]
    pub backup_files: Vec<BackupEntry>,
    /// Free-form outputs and flags
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    #[serde(default)]
    pub undo: Option<UndoState>,
}

impl Operation {
    #[must_use]
    pub fn new(kind: OperationKind, arguments: Vec<String>) -> Self {
        Self {
            kind,
            arguments,
            component: None,
            requires_elevation: false,
            state: OperationState::Registered,
            backup_files: Vec::new(),
            values: BTreeMap::new(),
            undo: None,
        }
    }

    #[must_use]
    pub fn from_descriptor(descriptor: &OperationDescriptor) -> Self {
        Self::new(
            OperationKind::from_name(&descriptor.name),
            descriptor.arguments.clone(),
        )
    }

    #[must_use]
    pub fn for_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Flag the operation as privileged
    #[must_use]
    pub fn elevated(mut self) -> Self {
        self.values.insert(ADMIN_VALUE.to_string(), "true".to_string());
        self.requires_elevation = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    #[must_use]
    pub fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor::new(self.kind.name(), self.arguments.clone())
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Undoable iff execute recorded an undo payload
    #[must_use]
    pub fn is_undoable(&self) -> bool {
        self.undo.is_some()
            && matches!(
                self.state,
                OperationState::Executed | OperationState::Committed
            )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor())
    }
}
