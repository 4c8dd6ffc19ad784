//! Operation kinds and their accepted argument counts

use ifw_errors::Arity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every built-in operation plus script-registered custom names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationKind {
    Copy,
    Move,
    Delete,
    Mkdir,
    Rmdir,
    AppendFile,
    PrependFile,
    Replace,
    LineReplace,
    CreateLink,
    CreateShortcut,
    CreateDesktopEntry,
    RegisterFileType,
    EnvironmentVariable,
    GlobalSettings,
    ElevatedExecute,
    ConsumeOutput,
    ExtractArchive,
    CopyDirectory,
    Custom(String),
}

impl OperationKind {
    pub const BUILTIN: [Self; 19] = [
        Self::Copy,
        Self::Move,
        Self::Delete,
        Self::Mkdir,
        Self::Rmdir,
        Self::AppendFile,
        Self::PrependFile,
        Self::Replace,
        Self::LineReplace,
        Self::CreateLink,
        Self::CreateShortcut,
        Self::CreateDesktopEntry,
        Self::RegisterFileType,
        Self::EnvironmentVariable,
        Self::GlobalSettings,
        Self::ElevatedExecute,
        Self::ConsumeOutput,
        Self::ExtractArchive,
        Self::CopyDirectory,
    ];

    /// Resolve a descriptor name; anything unknown is a custom kind
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self::BUILTIN
            .into_iter()
            .find(|kind| kind.name() == name)
            .unwrap_or_else(|| Self::Custom(name.to_string()))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Copy => "Copy",
            Self::Move => "Move",
            Self::Delete => "Delete",
            Self::Mkdir => "Mkdir",
            Self::Rmdir => "Rmdir",
            Self::AppendFile => "AppendFile",
            Self::PrependFile => "PrependFile",
            Self::Replace => "Replace",
            Self::LineReplace => "LineReplace",
            Self::CreateLink => "CreateLink",
            Self::CreateShortcut => "CreateShortcut",
            Self::CreateDesktopEntry => "CreateDesktopEntry",
            Self::RegisterFileType => "RegisterFileType",
            Self::EnvironmentVariable => "EnvironmentVariable",
            Self::GlobalSettings => "GlobalSettings",
            Self::ElevatedExecute => "ElevatedExecute",
            Self::ConsumeOutput => "ConsumeOutput",
            Self::ExtractArchive => "ExtractArchive",
            Self::CopyDirectory => "CopyDirectory",
            Self::Custom(name) => name,
        }
    }

    /// Accepted argument counts; `None` for custom kinds, which declare
    /// their own
    #[must_use]
    pub fn arity(&self) -> Option<Arity> {
        Some(match self {
            Self::Copy
            | Self::Move
            | Self::AppendFile
            | Self::PrependFile
            | Self::CreateLink
            | Self::CreateDesktopEntry
            | Self::ExtractArchive => Arity::Exactly(2),
            Self::Delete | Self::Mkdir | Self::Rmdir => Arity::Exactly(1),
            Self::Replace => Arity::Exactly(3),
            Self::LineReplace => Arity::Only(3),
            Self::CreateShortcut | Self::ConsumeOutput => Arity::AtLeast(2),
            Self::RegisterFileType => Arity::Range(2, 5),
            Self::EnvironmentVariable => Arity::Range(2, 4),
            Self::GlobalSettings => Arity::Either(3, 4),
            Self::ElevatedExecute => Arity::AtLeast(1),
            Self::CopyDirectory => Arity::Range(2, 3),
            Self::Custom(_) => return None,
        })
    }

    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for OperationKind {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<OperationKind> for String {
    fn from(value: OperationKind) -> Self {
        value.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in OperationKind::BUILTIN {
            assert_eq!(OperationKind::from_name(kind.name()), kind);
            assert!(kind.arity().is_some());
        }
        assert_eq!(
            OperationKind::from_name("RegisterService"),
            OperationKind::Custom("RegisterService".to_string())
        );
    }
}
