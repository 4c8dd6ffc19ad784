//! Resolution requests and the plans they produce

use ifw_types::{RunMode, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What the user asked for
#[derive(Clone, Debug)]
pub struct ResolveRequest {
    pub mode: RunMode,
    /// Explicitly selected component names; empty means "everything" for
    /// update and uninstall
    pub selected: Vec<String>,
    /// Installed components and their versions
    pub installed: BTreeMap<String, Version>,
}

impl ResolveRequest {
    #[must_use]
    pub fn install<I, S>(selected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(RunMode::Install, selected)
    }

    #[must_use]
    pub fn update<I, S>(selected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(RunMode::Update, selected)
    }

    #[must_use]
    pub fn uninstall<I, S>(selected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(RunMode::Uninstall, selected)
    }

    fn new<I, S>(mode: RunMode, selected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode,
            selected: selected.into_iter().map(Into::into).collect(),
            installed: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_installed(mut self, installed: BTreeMap<String, Version>) -> Self {
        self.installed = installed;
        self
    }
}

/// Why a component is part of an install plan
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallReason {
    Selected,
    Dependency,
    AutoDependency,
    Forced,
    Update,
}

impl fmt::Display for InstallReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Selected => "selected",
            Self::Dependency => "dependency",
            Self::AutoDependency => "auto dependency",
            Self::Forced => "forced",
            Self::Update => "update",
        })
    }
}

/// One component to install
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub name: String,
    pub version: Version,
    pub reason: InstallReason,
    /// Installed version this entry replaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<Version>,
}

/// Ordered result of a resolution
///
/// `remove` runs first, dependents before their dependencies; `install`
/// follows, dependencies first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub mode: RunMode,
    pub remove: Vec<String>,
    pub install: Vec<PlanEntry>,
}

impl Plan {
    #[must_use]
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            remove: Vec::new(),
            install: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.install.is_empty()
    }

    #[must_use]
    pub fn install_names(&self) -> Vec<&str> {
        self.install.iter().map(|e| e.name.as_str()).collect()
    }

    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&PlanEntry> {
        self.install.iter().find(|e| e.name == name)
    }
}
