//! Metadata job: collect `Updates.xml` from every repository

use futures::future::join_all;
use ifw_config::constants::UPDATES_FILE;
use ifw_config::FetchPolicy;
use ifw_errors::{Error, InstallError};
use ifw_events::{EventEmitter, EventSender, FailureContext, LifecycleEvent};
use ifw_metadata::UpdatesInfo;
use ifw_net::{fetch_text, join_url, Downloader};
use ifw_types::Component;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Components offered by all repositories that answered
#[derive(Debug, Clone, Default)]
pub struct FetchedMetadata {
    pub application_name: Option<String>,
    pub application_version: Option<String>,
    /// One entry per component name, the newest version across sources
    pub components: Vec<Component>,
    /// Sources that could not be read, with the reason
    pub failures: Vec<(String, String)>,
    pub sources: usize,
}

impl FetchedMetadata {
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }
}

async fn fetch_source(
    downloader: &Downloader,
    base: &str,
    cancel: &CancellationToken,
) -> Result<UpdatesInfo, Error> {
    let url = join_url(base, UPDATES_FILE);
    let xml = fetch_text(downloader, &url, cancel).await?;
    let mut updates = UpdatesInfo::parse(&xml, &url)?;
    updates.set_repository(base);
    Ok(updates)
}

/// Fetch every repository concurrently and merge the results
///
/// # Errors
///
/// `Cancelled`; under [`FetchPolicy::All`] the first failing source as
/// `SourceFailed`; under [`FetchPolicy::Any`] `NoUpdateSources` when no
/// source could be read.
pub async fn fetch_metadata(
    downloader: &Downloader,
    repositories: &[String],
    policy: FetchPolicy,
    cancel: &CancellationToken,
    events: &Option<EventSender>,
) -> Result<FetchedMetadata, Error> {
    let results = join_all(
        repositories
            .iter()
            .map(|base| fetch_source(downloader, base, cancel)),
    )
    .await;
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let mut fetched = FetchedMetadata {
        sources: repositories.len(),
        ..FetchedMetadata::default()
    };
    let mut merged: BTreeMap<String, Component> = BTreeMap::new();
    let mut order = Vec::new();

    for (base, result) in repositories.iter().zip(results) {
        let updates = match result {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!(source = %base, error = %e, "update source failed");
                events.emit_lifecycle(LifecycleEvent::SourceFailed {
                    url: base.clone(),
                    failure: FailureContext::from_error(&e),
                });
                if policy == FetchPolicy::All {
                    return Err(InstallError::SourceFailed {
                        source_url: base.clone(),
                        message: e.to_string(),
                    }
                    .into());
                }
                fetched.failures.push((base.clone(), e.to_string()));
                continue;
            }
        };

        tracing::debug!(source = %base, packages = updates.packages.len(), "update source read");
        fetched
            .application_name
            .get_or_insert(updates.application_name);
        fetched
            .application_version
            .get_or_insert(updates.application_version);
        for component in updates.packages {
            match merged.get(&component.name) {
                Some(existing) if existing.version >= component.version => {}
                Some(_) => {
                    merged.insert(component.name.clone(), component);
                }
                None => {
                    order.push(component.name.clone());
                    merged.insert(component.name.clone(), component);
                }
            }
        }
    }

    if fetched.failures.len() == repositories.len() {
        return Err(InstallError::NoUpdateSources {
            failures: fetched
                .failures
                .iter()
                .map(|(url, message)| format!("{url}: {message}"))
                .collect(),
        }
        .into());
    }

    fetched.components = order
        .into_iter()
        .filter_map(|name| merged.remove(&name))
        .collect();
    events.emit_lifecycle(LifecycleEvent::MetadataFetched {
        sources: fetched.sources,
        failed_sources: fetched.failures.len(),
        components: fetched.components.len(),
    });
    Ok(fetched)
}
