//! `Updates.xml`: the metadata a repository publishes

use crate::element::{parse_document, Element, XmlWriter};
use crate::{invalid, parse_bool, parse_date, DATE_FORMAT};
use ifw_errors::{Error, FormatError};
use ifw_hash::{Hash, HashAlgorithm};
use ifw_types::{ArchiveRef, Component, Dependency, OperationDescriptor, Version};

/// Parsed repository metadata
#[derive(Debug, Clone)]
pub struct UpdatesInfo {
    pub application_name: String,
    pub application_version: String,
    pub packages: Vec<Component>,
}

impl UpdatesInfo {
    #[must_use]
    pub fn new(application_name: impl Into<String>, application_version: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            application_version: application_version.into(),
            packages: Vec::new(),
        }
    }

    /// Parse an `Updates` document
    ///
    /// `file` names the document in error messages.
    ///
    /// # Errors
    ///
    /// `FormatError::Xml` for malformed XML, `UnexpectedRoot` for another
    /// root element and `InvalidContent` for missing required fields.
    pub fn parse(xml: &str, file: &str) -> Result<Self, Error> {
        let root = parse_document(xml, file)?;
        if root.name != "Updates" {
            return Err(FormatError::UnexpectedRoot {
                found: root.name,
                expected: "Updates".to_string(),
            }
            .into());
        }

        let application_name = root
            .child_text("ApplicationName")
            .ok_or_else(|| invalid(file, "ApplicationName element is missing."))?
            .to_string();
        let application_version = root
            .child_text("ApplicationVersion")
            .ok_or_else(|| invalid(file, "ApplicationVersion element is missing."))?
            .to_string();

        let packages = root
            .children_named("PackageUpdate")
            .map(|element| parse_package_update(element, file))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            application_name,
            application_version,
            packages,
        })
    }

    /// Record the repository base URL on every package
    pub fn set_repository(&mut self, base: &str) {
        for package in &mut self.packages {
            package.repository = Some(base.to_string());
        }
    }

    #[must_use]
    pub fn package(&self, name: &str) -> Option<&Component> {
        self.packages.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut w = XmlWriter::new();
        w.open("Updates", &[]);
        w.text("ApplicationName", &self.application_name);
        w.text("ApplicationVersion", &self.application_version);
        for package in &self.packages {
            write_package_update(&mut w, package);
        }
        w.close("Updates");
        w.finish()
    }
}

fn parse_package_update(element: &Element, file: &str) -> Result<Component, Error> {
    let name = element
        .child_text("Name")
        .ok_or_else(|| invalid(file, "PackageUpdate element without Name"))?;
    let version = element
        .child_text("Version")
        .ok_or_else(|| invalid(file, format!("PackageUpdate element without Version ({name})")))?;
    let release_date = element
        .child_text("ReleaseDate")
        .ok_or_else(|| invalid(file, format!("PackageUpdate element without ReleaseDate ({name})")))?;

    let mut component = Component::new(name, Version::parse(version)?, parse_date(release_date, file)?);

    if let Some(display) = element.child_text("DisplayName") {
        component.display_name = display.to_string();
    }
    // The first description without a language wins
    component.description = element
        .children_named("Description")
        .find(|d| d.attribute("xml:lang").is_none())
        .or_else(|| element.child("Description"))
        .map(|d| d.text.trim().to_string())
        .unwrap_or_default();

    if let Some(deps) = element.child_text("Dependencies") {
        component.dependencies = Dependency::parse_list(deps)?;
    }
    if let Some(auto) = element.child_text("AutoDependOn") {
        component.auto_depend_on = split_list(auto);
    }
    component.virtual_component = element.child_text("Virtual").is_some_and(parse_bool);
    component.default = element.child_text("Default").is_some_and(parse_bool);
    component.forced_install = element.child_text("ForcedInstallation").is_some_and(parse_bool);
    component.checkable = element.child_text("Checkable").is_none_or(parse_bool);
    component.script = element.child_text("Script").map(str::to_string);

    if let Some(update_file) = element.child("UpdateFile") {
        component.compressed_size = size_attribute(update_file, "CompressedSize", file)?;
        component.uncompressed_size = size_attribute(update_file, "UncompressedSize", file)?;
    }

    if let Some(archives) = element.child_text("DownloadableArchives") {
        component.archives = split_list(archives).into_iter().map(ArchiveRef::new).collect();
    }
    for archive in element.children_named("Archive") {
        let archive = parse_archive(archive, file)?;
        match component.archives.iter_mut().find(|a| a.name == archive.name) {
            Some(existing) => existing.hash = archive.hash,
            None => component.archives.push(archive),
        }
    }

    if let Some(operations) = element.child("Operations") {
        component.operations = operations
            .children_named("Operation")
            .map(|op| parse_operation(op, file))
            .collect::<Result<Vec<_>, _>>()?;
    }

    Ok(component)
}

pub(crate) fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn size_attribute(element: &Element, name: &str, file: &str) -> Result<u64, Error> {
    match element.attribute(name).map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value
            .parse()
            .map_err(|_| invalid(file, format!("{name} '{value}' is not a size"))),
        None => Ok(0),
    }
}

fn parse_archive(element: &Element, file: &str) -> Result<ArchiveRef, Error> {
    let name = element
        .attribute("name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| invalid(file, "Archive element without name"))?;
    let mut archive = ArchiveRef::new(name);
    if let Some(hex) = element.attribute("sha256") {
        archive.hash = Some(Hash::from_hex(HashAlgorithm::Sha256, hex.trim())?);
    } else if let Some(hex) = element.attribute("blake3") {
        archive.hash = Some(Hash::from_hex(HashAlgorithm::Blake3, hex.trim())?);
    }
    Ok(archive)
}

fn parse_operation(element: &Element, file: &str) -> Result<OperationDescriptor, Error> {
    let name = element
        .attribute("name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| invalid(file, "Operation element without name"))?;
    let arguments = element
        .children_named("Argument")
        .map(|arg| arg.text.clone())
        .collect::<Vec<_>>();
    Ok(OperationDescriptor::new(name, arguments))
}

fn write_package_update(w: &mut XmlWriter, package: &Component) {
    w.open("PackageUpdate", &[]);
    w.text("Name", &package.name);
    w.text("DisplayName", &package.display_name);
    if !package.description.is_empty() {
        w.text("Description", &package.description);
    }
    w.text("Version", package.version.as_str());
    w.text(
        "ReleaseDate",
        &package.release_date.format(DATE_FORMAT).to_string(),
    );
    if !package.dependencies.is_empty() {
        let deps: Vec<String> = package.dependencies.iter().map(ToString::to_string).collect();
        w.text("Dependencies", &deps.join(","));
    }
    if !package.auto_depend_on.is_empty() {
        w.text("AutoDependOn", &package.auto_depend_on.join(","));
    }
    for (tag, value) in [
        ("Virtual", package.virtual_component),
        ("Default", package.default),
        ("ForcedInstallation", package.forced_install),
    ] {
        if value {
            w.text(tag, "true");
        }
    }
    if !package.checkable {
        w.text("Checkable", "false");
    }
    if let Some(script) = &package.script {
        w.text("Script", script);
    }
    let compressed = package.compressed_size.to_string();
    let uncompressed = package.uncompressed_size.to_string();
    w.element(
        "UpdateFile",
        &[
            ("CompressedSize", compressed.as_str()),
            ("UncompressedSize", uncompressed.as_str()),
        ],
        "",
    );
    for archive in &package.archives {
        match &archive.hash {
            Some(hash) => {
                let hex = hash.to_hex();
                w.element(
                    "Archive",
                    &[("name", archive.name.as_str()), (hash.algorithm().name(), hex.as_str())],
                    "",
                );
            }
            None => w.element("Archive", &[("name", archive.name.as_str())], ""),
        }
    }
    if !package.operations.is_empty() {
        w.open("Operations", &[]);
        for op in &package.operations {
            w.open("Operation", &[("name", op.name.as_str())]);
            for arg in &op.arguments {
                w.text("Argument", arg);
            }
            w.close("Operation");
        }
        w.close("Operations");
    }
    w.close("PackageUpdate");
}
