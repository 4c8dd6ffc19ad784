//! Large operations that delegate to the install crate

use crate::{OfflineReport, OpsCtx};
use ifw_errors::Error;
use ifw_events::EventEmitter;
use ifw_install::{InstallContext, UninstallContext, UpdateContext};
use ifw_types::RunReport;
use std::path::Path;

/// Install components and whatever they pull in
///
/// # Errors
///
/// Returns an error if crash recovery fails or the run breaks internally.
/// Ordinary failures are described by the returned report.
pub async fn install(ctx: &OpsCtx, components: &[String]) -> Result<RunReport, Error> {
    ctx.emit_command_started(format!("install {}", components.join(" ")));

    let context = components
        .iter()
        .fold(InstallContext::new(), |context, name| context.add_component(name))
        .with_cancel(ctx.cancel.clone())
        .with_event_sender(ctx.tx.clone());
    let report = ctx
        .installer
        .install(context)
        .await
        .inspect_err(|e| ctx.emit_command_failed("install", e.to_string()))?;

    ctx.emit_command_completed("install", report.is_success());
    Ok(report)
}

/// Update installed components; an empty list means all of them
///
/// # Errors
///
/// See [`install`].
pub async fn update(ctx: &OpsCtx, components: &[String]) -> Result<RunReport, Error> {
    ctx.emit_command_started("update");

    let context = components
        .iter()
        .fold(UpdateContext::new(), |context, name| context.add_component(name))
        .with_cancel(ctx.cancel.clone())
        .with_event_sender(ctx.tx.clone());
    let report = ctx
        .installer
        .update(context)
        .await
        .inspect_err(|e| ctx.emit_command_failed("update", e.to_string()))?;

    ctx.emit_command_completed("update", report.is_success());
    Ok(report)
}

/// Uninstall components; an empty list removes everything
///
/// # Errors
///
/// See [`install`].
pub async fn uninstall(ctx: &OpsCtx, components: &[String]) -> Result<RunReport, Error> {
    ctx.emit_command_started("uninstall");

    let context = components
        .iter()
        .fold(UninstallContext::new(), |context, name| context.add_component(name))
        .with_cancel(ctx.cancel.clone())
        .with_event_sender(ctx.tx.clone());
    let report = ctx
        .installer
        .uninstall(context)
        .await
        .inspect_err(|e| ctx.emit_command_failed("uninstall", e.to_string()))?;

    ctx.emit_command_completed("uninstall", report.is_success());
    Ok(report)
}

/// Build an offline installer from a repository directory
///
/// # Errors
///
/// Returns an error if the repository is incomplete or the output cannot
/// be written.
pub async fn create_installer(
    ctx: &OpsCtx,
    repository: &Path,
    stub: &Path,
    output: &Path,
    components: &[String],
) -> Result<OfflineReport, Error> {
    ctx.emit_command_started(format!("create-installer {}", output.display()));

    let created = ifw_install::create_installer(repository, stub, output, components)
        .await
        .inspect_err(|e| ctx.emit_command_failed("create-installer", e.to_string()))?;
    ctx.emit_command_completed("create-installer", true);

    Ok(OfflineReport {
        path: created.path,
        components: created.components,
        archives: created.archives,
        bytes: created.bytes,
    })
}
