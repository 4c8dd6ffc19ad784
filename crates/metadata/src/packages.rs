//! `components.xml`: the installed-state record of a target directory

use crate::element::{parse_document, XmlWriter};
use crate::updates::split_list;
use crate::{invalid, parse_bool, parse_date, DATE_FORMAT};
use chrono::NaiveDate;
use ifw_errors::{Error, FormatError};
use ifw_types::{Component, Dependency, Version};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One installed component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub title: String,
    pub description: String,
    pub version: Version,
    pub release_date: NaiveDate,
    pub install_date: NaiveDate,
    pub dependencies: Vec<Dependency>,
    /// Components whose removal takes this one with it
    pub auto_depend_on: Vec<String>,
    pub forced_install: bool,
    pub virtual_component: bool,
    pub uncompressed_size: u64,
}

impl PackageInfo {
    /// Record for a component installed on `install_date`
    #[must_use]
    pub fn from_component(component: &Component, install_date: NaiveDate) -> Self {
        Self {
            name: component.name.clone(),
            title: component.display_name.clone(),
            description: component.description.clone(),
            version: component.version.clone(),
            release_date: component.release_date,
            install_date,
            dependencies: component.dependencies.clone(),
            auto_depend_on: component.auto_depend_on.clone(),
            forced_install: component.forced_install,
            virtual_component: component.virtual_component,
            uncompressed_size: component.uncompressed_size,
        }
    }
}

/// Installed-state record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagesInfo {
    pub application_name: String,
    pub application_version: String,
    pub packages: Vec<PackageInfo>,
}

impl PackagesInfo {
    #[must_use]
    pub fn new(application_name: impl Into<String>, application_version: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            application_version: application_version.into(),
            packages: Vec::new(),
        }
    }

    /// Parse a `Packages` document
    ///
    /// # Errors
    ///
    /// Malformed XML, a different root element, or a `Package` without
    /// `Name`, `Version` or `ReleaseDate`.
    pub fn parse(xml: &str, file: &str) -> Result<Self, Error> {
        let root = parse_document(xml, file)?;
        if root.name != "Packages" {
            return Err(FormatError::UnexpectedRoot {
                found: root.name,
                expected: "Packages".to_string(),
            }
            .into());
        }

        let mut info = Self::new(
            root.child_text("ApplicationName").unwrap_or_default(),
            root.child_text("ApplicationVersion").unwrap_or_default(),
        );

        for element in root.children_named("Package") {
            let name = element
                .child_text("Name")
                .ok_or_else(|| invalid(file, "Package element without Name"))?;
            let version = element
                .child_text("Version")
                .ok_or_else(|| invalid(file, format!("Package element without Version ({name})")))?;
            let release_date = parse_date(
                element
                    .child_text("ReleaseDate")
                    .ok_or_else(|| invalid(file, format!("Package element without ReleaseDate ({name})")))?,
                file,
            )?;
            let install_date = match element.child_text("InstallDate") {
                Some(date) => parse_date(date, file)?,
                None => release_date,
            };
            info.packages.push(PackageInfo {
                name: name.to_string(),
                title: element.child_text("Title").unwrap_or(name).to_string(),
                description: element.child_text("Description").unwrap_or_default().to_string(),
                version: Version::parse(version)?,
                release_date,
                install_date,
                dependencies: Dependency::parse_list(element.child_text("Dependencies").unwrap_or_default())?,
                auto_depend_on: split_list(element.child_text("AutoDependOn").unwrap_or_default()),
                forced_install: element.child_text("ForcedInstallation").is_some_and(parse_bool),
                virtual_component: element.child_text("Virtual").is_some_and(parse_bool),
                uncompressed_size: element
                    .child_text("Size")
                    .map(|s| s.parse::<u64>().map_err(|_| invalid(file, format!("Size '{s}' is not a size"))))
                    .transpose()?
                    .unwrap_or(0),
            });
        }
        Ok(info)
    }

    /// Read the record at `path`; a missing file is `Ok(None)`
    ///
    /// # Errors
    ///
    /// I/O failures other than not-found, and parse errors.
    pub async fn load(path: &Path) -> Result<Option<Self>, Error> {
        match tokio::fs::read_to_string(path).await {
            Ok(xml) => Self::parse(&xml, &path.display().to_string()).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io_with_path(&e, path)),
        }
    }

    /// Write the record atomically
    ///
    /// # Errors
    ///
    /// I/O failures while writing or renaming the file.
    pub async fn save(&self, path: &Path) -> Result<(), Error> {
        ifw_platform::filesystem::atomic_write(path, self.to_xml().as_bytes()).await?;
        tracing::debug!(path = %path.display(), packages = self.packages.len(), "wrote installed-state record");
        Ok(())
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&PackageInfo> {
        self.packages.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Add a package, replacing any previous record of the same name
    pub fn install_package(&mut self, package: PackageInfo) {
        match self.packages.iter_mut().find(|p| p.name == package.name) {
            Some(existing) => *existing = package,
            None => self.packages.push(package),
        }
    }

    /// Returns `false` if no package of that name is recorded
    pub fn update_package(&mut self, name: &str, version: Version, date: NaiveDate) -> bool {
        match self.packages.iter_mut().find(|p| p.name == name) {
            Some(package) => {
                package.version = version;
                package.install_date = date;
                true
            }
            None => false,
        }
    }

    /// Returns `false` if no package of that name is recorded
    pub fn remove_package(&mut self, name: &str) -> bool {
        let before = self.packages.len();
        self.packages.retain(|p| p.name != name);
        self.packages.len() != before
    }

    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut w = XmlWriter::new();
        w.open("Packages", &[]);
        w.text("ApplicationName", &self.application_name);
        w.text("ApplicationVersion", &self.application_version);
        for package in &self.packages {
            w.open("Package", &[]);
            w.text("Name", &package.name);
            w.text("Title", &package.title);
            w.text("Description", &package.description);
            w.text("Version", package.version.as_str());
            w.text("ReleaseDate", &package.release_date.format(DATE_FORMAT).to_string());
            w.text("InstallDate", &package.install_date.format(DATE_FORMAT).to_string());
            if !package.dependencies.is_empty() {
                let deps: Vec<String> = package.dependencies.iter().map(ToString::to_string).collect();
                w.text("Dependencies", &deps.join(","));
            }
            if !package.auto_depend_on.is_empty() {
                w.text("AutoDependOn", &package.auto_depend_on.join(","));
            }
            if package.forced_install {
                w.text("ForcedInstallation", "true");
            }
            if package.virtual_component {
                w.text("Virtual", "true");
            }
            w.text("Size", &package.uncompressed_size.to_string());
            w.close("Package");
        }
        w.close("Packages");
        w.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_install_update_remove() {
        let mut info = PackagesInfo::new("Demo", "1.0");
        let mut component = Component::new("app.core", Version::parse("1.0").unwrap(), date(2024, 1, 1));
        component.dependencies = vec![Dependency::parse("app.runtime->=1.0").unwrap()];
        component.auto_depend_on = vec!["app.runtime".to_string()];
        info.install_package(PackageInfo::from_component(&component, date(2024, 5, 1)));
        info.install_package(PackageInfo::from_component(&component, date(2024, 5, 2)));
        assert_eq!(info.packages.len(), 1);

        assert!(info.update_package("app.core", Version::parse("1.1").unwrap(), date(2024, 6, 1)));
        assert!(!info.update_package("absent", Version::parse("1").unwrap(), date(2024, 6, 1)));

        let xml = info.to_xml();
        assert!(xml.contains("<AutoDependOn>app.runtime</AutoDependOn>"));
        let reparsed = PackagesInfo::parse(&xml, "components.xml").unwrap();
        assert_eq!(reparsed, info);
        assert_eq!(reparsed.packages[0].auto_depend_on, vec!["app.runtime"]);

        assert!(info.remove_package("app.core"));
        assert!(!info.remove_package("app.core"));
    }

    #[test]
    fn test_package_requires_release_date() {
        let err = PackagesInfo::parse(
            "<Packages><Package><Name>a</Name><Version>1</Version></Package></Packages>",
            "components.xml",
        )
        .unwrap_err();
        assert!(err.to_string().contains("without ReleaseDate"));
    }
}
