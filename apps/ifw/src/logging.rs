//! Structured logging integration for events
//!
//! This module converts domain events into tracing records with structured
//! fields so that the JSON debug log can be consumed by observability tools.

use ifw_events::{
    AppEvent, ContainerEvent, DownloadEvent, EventMeta, GeneralEvent, LifecycleEvent,
    OperationEvent, ResolverEvent,
};
use tracing::{debug, error, info, trace, warn};

/// Log an `AppEvent` using the tracing infrastructure with structured fields
///
/// `command` is recorded as the correlation id so that all records of one
/// invocation can be grouped.
pub fn log_event_with_tracing(event: &AppEvent, command: &str) {
    let meta = EventMeta::for_event(event).with_correlation_id(command);
    let source = meta.source.as_str();
    let event_id = meta.event_id;
    let correlation = meta.correlation_id.as_deref().unwrap_or_default();

    match event {
        AppEvent::Download(download) => match download {
            DownloadEvent::Started {
                url,
                component,
                total_size,
            } => {
                info!(source, %event_id, correlation, url = %url, component = ?component, total_size = ?total_size, "Download started");
            }
            DownloadEvent::Progress { url, progress } => {
                trace!(
                    source,
                    url = %url,
                    bytes_received = progress.bytes_received,
                    bytes_total = ?progress.bytes_total,
                    bytes_per_second = progress.bytes_per_second,
                    "Download progress"
                );
            }
            DownloadEvent::Completed {
                url,
                component,
                final_size,
                hash,
            } => {
                info!(source, %event_id, correlation, url = %url, component = ?component, final_size, hash = ?hash, "Download completed");
            }
            DownloadEvent::Retrying {
                url,
                attempt,
                reason,
            } => {
                warn!(source, %event_id, correlation, url = %url, attempt, reason = %reason, "Download retrying");
            }
            DownloadEvent::HashMismatch {
                url,
                expected,
                actual,
            } => {
                warn!(source, %event_id, correlation, url = %url, expected = %expected, actual = %actual, "Download hash mismatch");
            }
            DownloadEvent::Cancelled { url } => {
                info!(source, %event_id, correlation, url = %url, "Download cancelled");
            }
            DownloadEvent::Failed { url, failure } => {
                error!(
                    source,
                    %event_id,
                    correlation,
                    url = %url,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Download failed"
                );
            }
        },

        AppEvent::Operation(operation) => match operation {
            OperationEvent::Executing {
                component,
                operation,
                index,
            } => {
                debug!(source, component = ?component, operation = %operation, index, "Executing operation");
            }
            OperationEvent::Executed {
                component,
                operation,
            } => {
                debug!(source, component = ?component, operation = %operation, "Operation executed");
            }
            OperationEvent::Failed {
                component,
                operation,
                failure,
            } => {
                error!(
                    source,
                    %event_id,
                    correlation,
                    component = ?component,
                    operation = %operation,
                    code = ?failure.code,
                    message = %failure.message,
                    "Operation failed"
                );
            }
            OperationEvent::Undoing {
                component,
                operation,
            } => {
                debug!(source, component = ?component, operation = %operation, "Undoing operation");
            }
            OperationEvent::Undone {
                component,
                operation,
            } => {
                info!(source, component = ?component, operation = %operation, "Operation undone");
            }
            OperationEvent::UndoFailed {
                component,
                operation,
                failure,
            } => {
                error!(
                    source,
                    %event_id,
                    correlation,
                    component = ?component,
                    operation = %operation,
                    code = ?failure.code,
                    message = %failure.message,
                    "Undo failed"
                );
            }
            OperationEvent::Committed { count } => {
                info!(source, %event_id, correlation, count, "Operations committed");
            }
        },

        AppEvent::Resolver(resolver) => match resolver {
            ResolverEvent::Started { requested, mode } => {
                info!(source, %event_id, correlation, requested = ?requested, mode = %mode, "Resolution started");
            }
            ResolverEvent::Completed { install, remove } => {
                info!(source, %event_id, correlation, install = ?install, remove = ?remove, "Resolution completed");
            }
            ResolverEvent::Failed { failure } => {
                error!(
                    source,
                    %event_id,
                    correlation,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Resolution failed"
                );
            }
        },

        AppEvent::Lifecycle(lifecycle) => match lifecycle {
            LifecycleEvent::StateChanged { from, to } => {
                debug!(source, from = %from, to = %to, "Run state changed");
            }
            LifecycleEvent::SourceFailed { url, failure } => {
                warn!(source, %event_id, correlation, url = %url, message = %failure.message, "Repository unavailable");
            }
            LifecycleEvent::MetadataFetched {
                sources,
                failed_sources,
                components,
            } => {
                info!(source, %event_id, correlation, sources, failed_sources, components, "Metadata fetched");
            }
            LifecycleEvent::ComponentInstalling { name, version } => {
                info!(source, component = %name, version = %version, "Installing component");
            }
            LifecycleEvent::ComponentInstalled { name, version } => {
                info!(source, %event_id, correlation, component = %name, version = %version, "Component installed");
            }
            LifecycleEvent::ComponentRemoved { name } => {
                info!(source, %event_id, correlation, component = %name, "Component removed");
            }
            LifecycleEvent::RecoveryStarted { operations } => {
                warn!(source, %event_id, correlation, operations, "Recovering interrupted run");
            }
            LifecycleEvent::RecoveryCompleted { undone } => {
                info!(source, %event_id, correlation, undone, "Recovery completed");
            }
            LifecycleEvent::UninstallerWritten { path } => {
                info!(source, %event_id, correlation, path = %path, "Maintenance tool written");
            }
            LifecycleEvent::Finished { status } => {
                info!(source, %event_id, correlation, status = %status, "Run finished");
            }
        },

        AppEvent::Container(container) => match container {
            ContainerEvent::Read {
                path,
                components,
                operations,
            } => {
                debug!(source, path = %path, components, operations, "Container read");
            }
            ContainerEvent::Written { path, bytes } => {
                debug!(source, path = %path, bytes, "Container written");
            }
        },

        AppEvent::General(general) => match general {
            GeneralEvent::Warning { message, context } => {
                warn!(source, %event_id, correlation, context = ?context, "{message}");
            }
            GeneralEvent::Error { message, details } => {
                error!(source, %event_id, correlation, details = ?details, "{message}");
            }
            GeneralEvent::DebugLog { message } => {
                debug!(source, "{message}");
            }
            GeneralEvent::CommandStarted { command } => {
                info!(source, %event_id, correlation, command = %command, "Command started");
            }
            GeneralEvent::CommandCompleted { command, success } => {
                info!(source, %event_id, correlation, command = %command, success, "Command completed");
            }
            GeneralEvent::CommandFailed { command, error } => {
                error!(source, %event_id, correlation, command = %command, error = %error, "Command failed");
            }
        },
    }
}
