//! Sequential execution of operations with undo on failure

use crate::journal::Journal;
use ifw_errors::{Error, InstallError};
use ifw_events::{EventEmitter, FailureContext, OperationEvent};
use ifw_operations::{Operation, OperationRegistry, RunContext};
use std::path::Path;

/// Where an apply step stopped
#[derive(Debug)]
pub(crate) struct ApplyFailure {
    pub component: Option<String>,
    pub operation: Option<String>,
    pub error: Error,
}

impl ApplyFailure {
    fn new(op: Option<&Operation>, error: Error) -> Self {
        Self {
            component: op.and_then(|op| op.component.clone()),
            operation: op.map(ToString::to_string),
            error,
        }
    }
}

/// Executed operations of one run, in execution order, mirrored into the
/// journal after every step
pub(crate) struct Transaction<'a> {
    registry: &'a OperationRegistry,
    journal: Journal,
    executed: Vec<Operation>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(registry: &'a OperationRegistry, journal: Journal) -> Self {
        Self {
            registry,
            journal,
            executed: Vec::new(),
        }
    }

    /// Persist the empty journal before anything is touched
    pub(crate) async fn begin(&self) -> Result<(), Error> {
        self.journal.save().await
    }

    pub(crate) fn executed(&self) -> &[Operation] {
        &self.executed
    }

    /// Journal a copy of the maintenance tool before it is rewritten
    pub(crate) async fn snapshot_tool(&mut self, tool: &Path, backup_dir: &Path) -> Result<(), Error> {
        self.journal.snapshot_tool(tool, backup_dir).await
    }

    /// Execute one operation
    ///
    /// Cancellation is only looked at here, between operations, so an
    /// operation that started always runs to completion. An operation that
    /// fails has already cleaned up after itself and is not part of the log.
    pub(crate) async fn execute(
        &mut self,
        mut op: Operation,
        ctx: &mut RunContext,
    ) -> Result<(), ApplyFailure> {
        if ctx.is_cancelled() {
            return Err(ApplyFailure::new(None, InstallError::Aborted.into()));
        }

        let index = self.executed.len();
        ctx.emit_operation(OperationEvent::Executing {
            component: op.component.clone(),
            operation: op.to_string(),
            index,
        });

        if let Err(error) = self.registry.execute(&mut op, ctx).await {
            let error = match error {
                Error::Cancelled => error,
                other => InstallError::OperationFailed {
                    component: op.component.clone().unwrap_or_default(),
                    operation: op.name().to_string(),
                    index,
                    message: other.to_string(),
                }
                .into(),
            };
            ctx.emit_operation(OperationEvent::Failed {
                component: op.component.clone(),
                operation: op.to_string(),
                failure: FailureContext::from_error(&error),
            });
            // Reported as the first undo step; its own cleanup already ran
            ctx.emit_operation(OperationEvent::Undoing {
                component: op.component.clone(),
                operation: op.to_string(),
            });
            ctx.emit_operation(OperationEvent::Undone {
                component: op.component.clone(),
                operation: op.to_string(),
            });
            return Err(ApplyFailure::new(Some(&op), error));
        }

        ctx.emit_operation(OperationEvent::Executed {
            component: op.component.clone(),
            operation: op.to_string(),
        });
        self.executed.push(op);
        if let Some(op) = self.executed.last() {
            self.journal
                .record(op)
                .await
                .map_err(|e| ApplyFailure::new(Some(op), e))?;
        }
        Ok(())
    }

    /// Undo the log tail-to-head, put the previous maintenance tool back and
    /// drop the journal
    ///
    /// Undo failures are reported and skipped so the rest still unwinds.
    /// Returns how many operations were undone.
    pub(crate) async fn rollback(mut self, ctx: &mut RunContext) -> usize {
        let undone = undo_all(self.registry, &mut self.executed, ctx, Some(&mut self.journal)).await;
        self.journal.restore_tool().await;
        if let Err(e) = self.journal.remove().await {
            tracing::warn!(error = %e, "could not remove journal after rollback");
        }
        undone
    }

    /// Make the run permanent: discard backups and drop the journal
    ///
    /// Returns the committed operations.
    pub(crate) async fn commit(mut self, ctx: &RunContext) -> Result<Vec<Operation>, Error> {
        for op in &mut self.executed {
            self.registry.commit(op).await;
        }
        ctx.emit_operation(OperationEvent::Committed {
            count: self.executed.len(),
        });
        self.journal.remove().await?;
        Ok(self.executed)
    }
}

/// Undo `operations` from last to first
///
/// Used for rollback, for uninstalling recorded operations and for crash
/// recovery. Returns the number of operations undone.
pub(crate) async fn undo_all(
    registry: &OperationRegistry,
    operations: &mut [Operation],
    ctx: &mut RunContext,
    mut journal: Option<&mut Journal>,
) -> usize {
    let mut undone = 0;
    for index in (0..operations.len()).rev() {
        let op = &mut operations[index];
        if !op.is_undoable() {
            continue;
        }
        ctx.emit_operation(OperationEvent::Undoing {
            component: op.component.clone(),
            operation: op.to_string(),
        });
        match registry.undo(op, ctx).await {
            Ok(()) => {
                undone += 1;
                ctx.emit_operation(OperationEvent::Undone {
                    component: op.component.clone(),
                    operation: op.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(operation = %op, error = %e, "undo failed");
                ctx.emit_operation(OperationEvent::UndoFailed {
                    component: op.component.clone(),
                    operation: op.to_string(),
                    failure: FailureContext::from_error(&e),
                });
            }
        }
        if let Some(journal) = journal.as_deref_mut() {
            if let Err(e) = journal.update(index, op).await {
                tracing::warn!(error = %e, "could not update journal");
            }
        }
    }
    undone
}
