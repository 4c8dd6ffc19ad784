//! Recovery of interrupted runs

use crate::{OpsCtx, RecoveryInfo};
use ifw_errors::Error;
use ifw_events::EventEmitter;

/// Undo whatever an interrupted run left behind in the target directory
///
/// # Errors
///
/// `RecoveryFailed` if the journal is unreadable or the installed state
/// cannot be restored.
pub async fn recover(ctx: &OpsCtx) -> Result<RecoveryInfo, Error> {
    ctx.emit_command_started("recover");
    let info = match ctx.installer.recover(Some(ctx.tx.clone())).await? {
        Some(report) => RecoveryInfo {
            recovered: true,
            operations: report.operations,
            undone: report.undone,
        },
        None => {
            ctx.emit_debug("no interrupted run found");
            RecoveryInfo::default()
        }
    };
    ctx.emit_command_completed("recover", true);
    Ok(info)
}
