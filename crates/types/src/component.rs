//! Installable component descriptions

use crate::{Dependency, OperationDescriptor, Version};
use chrono::NaiveDate;
use ifw_hash::Hash;
use serde::{Deserialize, Serialize};

/// A downloadable payload archive of a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<Hash>,
}

impl ArchiveRef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hash: None,
        }
    }

    #[must_use]
    pub fn with_hash(mut self, hash: Hash) -> Self {
        self.hash = Some(hash);
        self
    }
}

/// A named, versioned unit of installable content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub release_date: NaiveDate,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub auto_depend_on: Vec<String>,
    #[serde(default)]
    pub forced_install: bool,
    #[serde(default = "default_true")]
    pub checkable: bool,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub virtual_component: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default)]
    pub archives: Vec<ArchiveRef>,
    #[serde(default)]
    pub operations: Vec<OperationDescriptor>,
    #[serde(default)]
    pub compressed_size: u64,
    #[serde(default)]
    pub uncompressed_size: u64,
    /// Base URL of the repository the component was fetched from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<Version>,
}

fn default_true() -> bool {
    true
}

impl Component {
    #[must_use]
    pub fn new(name: impl Into<String>, version: Version, release_date: NaiveDate) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            version,
            description: String::new(),
            release_date,
            dependencies: Vec::new(),
            auto_depend_on: Vec::new(),
            forced_install: false,
            checkable: true,
            default: false,
            virtual_component: false,
            script: None,
            archives: Vec::new(),
            operations: Vec::new(),
            compressed_size: 0,
            uncompressed_size: 0,
            repository: None,
            installed_version: None,
        }
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed_version.is_some()
    }

    /// Installed with an older version than the one available
    #[must_use]
    pub fn has_update(&self) -> bool {
        self.installed_version
            .as_ref()
            .is_some_and(|installed| &self.version > installed)
    }

    /// Parent component name, `app` for `app.core`
    #[must_use]
    pub fn parent_name(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(parent, _)| parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_detection() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut component = Component::new("app.core", Version::parse("1.1").unwrap(), date);
        assert!(!component.is_installed());
        assert!(!component.has_update());

        component.installed_version = Some(Version::parse("1.0").unwrap());
        assert!(component.has_update());
        assert_eq!(component.parent_name(), Some("app"));
    }
}
