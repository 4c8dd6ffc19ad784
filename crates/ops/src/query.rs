//! Component listing and container inspection

use crate::{
    ComponentListing, ComponentStatus, InspectReport, InspectedArchive, InspectedComponent,
    OpsCtx,
};
use ifw_container::BinaryContent;
use ifw_errors::Error;
use ifw_events::EventEmitter;
use ifw_metadata::PackageInfo;
use ifw_operations::Operation;
use ifw_types::Component;
use std::collections::BTreeMap;
use std::path::Path;

/// List installed components, plus everything the repositories offer
/// unless `installed_only` is set
///
/// An unreachable repository degrades the listing to installed components
/// with a warning.
///
/// # Errors
///
/// Returns an error if `components.xml` cannot be read, or the fetch is
/// cancelled.
pub async fn list_components(
    ctx: &OpsCtx,
    installed_only: bool,
) -> Result<Vec<ComponentListing>, Error> {
    let installed = ctx
        .installer
        .installed_components()
        .await?
        .map(|state| state.packages)
        .unwrap_or_default();

    let available = if installed_only {
        Vec::new()
    } else {
        match ctx
            .installer
            .available_components(&ctx.cancel, Some(ctx.tx.clone()))
            .await
        {
            Ok(fetched) => fetched.components,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "listing installed components only");
                ctx.emit_warning_with_context("repositories unavailable", e.to_string());
                Vec::new()
            }
        }
    };

    Ok(merge_listing(&installed, &available))
}

fn merge_listing(installed: &[PackageInfo], available: &[Component]) -> Vec<ComponentListing> {
    let mut rows: BTreeMap<String, ComponentListing> = installed
        .iter()
        .map(|package| {
            let row = ComponentListing {
                name: package.name.clone(),
                display_name: package.title.clone(),
                description: package.description.clone(),
                installed_version: Some(package.version.clone()),
                available_version: None,
                status: ComponentStatus::Installed,
                dependencies: package.dependencies.iter().map(ToString::to_string).collect(),
                size: package.uncompressed_size,
            };
            (package.name.clone(), row)
        })
        .collect();

    for component in available.iter().filter(|c| !c.virtual_component) {
        let row = rows
            .entry(component.name.clone())
            .or_insert_with(|| ComponentListing {
                name: component.name.clone(),
                display_name: component.display_name.clone(),
                description: component.description.clone(),
                installed_version: None,
                available_version: None,
                status: ComponentStatus::Available,
                dependencies: component.dependencies.iter().map(ToString::to_string).collect(),
                size: component.uncompressed_size,
            });
        row.available_version = Some(component.version.clone());
        if row
            .installed_version
            .as_ref()
            .is_some_and(|installed| installed < &component.version)
        {
            row.status = ComponentStatus::Outdated;
        }
    }
    rows.into_values().collect()
}

/// Describe the trailer of an installer or maintenance tool
///
/// # Errors
///
/// Returns an error if the file has no valid trailer.
pub async fn inspect(path: &Path) -> Result<InspectReport, Error> {
    let owned = path.to_path_buf();
    let content = tokio::task::spawn_blocking(move || BinaryContent::open(&owned))
        .await
        .map_err(|e| Error::internal(format!("inspect task failed: {e}")))??;
    let layout = content.layout();

    let operations = content
        .operations()
        .iter()
        .map(|record| match serde_json::from_slice::<Operation>(&record.data) {
            Ok(op) => op.to_string(),
            Err(_) => record.name.clone(),
        })
        .collect();

    Ok(InspectReport {
        path: path.to_path_buf(),
        marker: layout.marker.to_string(),
        stub_len: content.stub_len(),
        metadata: layout.metadata.iter().map(|(name, _)| name.clone()).collect(),
        components: layout
            .components
            .iter()
            .map(|component| InspectedComponent {
                name: component.name.clone(),
                archives: component
                    .archives
                    .iter()
                    .map(|archive| InspectedArchive {
                        name: archive.name.clone(),
                        size: u64::try_from(archive.range.length).unwrap_or(0),
                    })
                    .collect(),
            })
            .collect(),
        operations,
        has_resource_archive: layout.resource_archive.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ifw_types::Version;

    fn component(name: &str, version: &str) -> Component {
        Component::new(
            name,
            Version::parse(version).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        )
    }

    #[test]
    fn test_merge_listing_status() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let installed = vec![
            PackageInfo::from_component(&component("app.core", "1.0"), date),
            PackageInfo::from_component(&component("app.docs", "2.0"), date),
        ];
        let mut hidden = component("app.hidden", "1.0");
        hidden.virtual_component = true;
        let available = vec![
            component("app.core", "1.1"),
            component("app.docs", "2.0"),
            component("app.extra", "0.9"),
            hidden,
        ];

        let rows = merge_listing(&installed, &available);
        let statuses: Vec<(&str, ComponentStatus)> =
            rows.iter().map(|r| (r.name.as_str(), r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("app.core", ComponentStatus::Outdated),
                ("app.docs", ComponentStatus::Installed),
                ("app.extra", ComponentStatus::Available),
            ]
        );
        assert_eq!(rows[2].installed_version, None);
    }

    #[tokio::test]
    async fn test_inspect_rejects_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain");
        std::fs::write(&path, b"not a container").unwrap();
        assert!(inspect(&path).await.is_err());
    }
}
