//! Validation, execution, undo and commit of operations

use crate::backup::discard;
use crate::context::RunContext;
use crate::kind::OperationKind;
use crate::kinds;
use crate::operation::{Operation, OperationState, UndoState};
use crate::script::CustomOperation;
use ifw_errors::{Error, OperationError, ValidationError};
use ifw_types::OperationDescriptor;
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Built-in kinds plus custom operations registered by scripts
#[derive(Clone, Default)]
pub struct OperationRegistry {
    custom: HashMap<String, Arc<dyn CustomOperation>>,
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.custom.keys().collect();
        names.sort();
        f.debug_struct("OperationRegistry")
            .field("custom", &names)
            .finish()
    }
}

/// Arguments that count towards the arity of `kind`
fn counted_arguments(kind: &OperationKind, args: &[String]) -> usize {
    match kind {
        OperationKind::RegisterFileType => {
            args.iter().filter(|a| !a.starts_with("progId=")).count()
        }
        _ => args.len(),
    }
}

impl OperationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Back a custom operation name with `operation`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `name` is a built-in kind.
    pub fn register_custom(
        &mut self,
        name: impl Into<String>,
        operation: Arc<dyn CustomOperation>,
    ) -> Result<(), Error> {
        let name = name.into();
        if !OperationKind::from_name(&name).is_custom() {
            return Err(ValidationError::InvalidArgument {
                operation: name,
                message: "a built-in operation cannot be replaced".to_string(),
            }
            .into());
        }
        self.custom.insert(name, operation);
        Ok(())
    }

    fn custom(&self, name: &str) -> Result<&Arc<dyn CustomOperation>, Error> {
        self.custom.get(name).ok_or_else(|| {
            ValidationError::UnknownOperation {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Check that `kind` exists and accepts `args`
    ///
    /// # Errors
    ///
    /// `UnknownOperation` or `InvalidArgumentCount`.
    pub fn validate(&self, kind: &OperationKind, args: &[String]) -> Result<(), Error> {
        let arity = match kind {
            OperationKind::Custom(name) => self.custom(name)?.arity(),
            builtin => builtin.arity(),
        };
        let given = counted_arguments(kind, args);
        match arity {
            Some(expected) if !expected.accepts(given) => {
                Err(ValidationError::InvalidArgumentCount {
                    operation: kind.name().to_string(),
                    given,
                    expected,
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    /// Build a validated operation from its descriptor
    ///
    /// # Errors
    ///
    /// See [`Self::validate`].
    pub fn create(
        &self,
        descriptor: &OperationDescriptor,
        component: Option<&str>,
    ) -> Result<Operation, Error> {
        let mut op = Operation::from_descriptor(descriptor);
        self.validate(&op.kind, &op.arguments)?;
        op.state = OperationState::Validated;
        op.component = component.map(str::to_string);
        op.requires_elevation = match op.kind {
            OperationKind::ElevatedExecute => true,
            OperationKind::EnvironmentVariable => {
                kinds::environment_needs_elevation(&op.arguments)
            }
            _ => false,
        };
        Ok(op)
    }

    /// Run `op` and record its undo payload on it
    ///
    /// # Errors
    ///
    /// Validation, elevation and substitution errors before anything is
    /// touched, or the operation's own failure after it cleaned up.
    pub async fn execute(
        &self,
        op: &mut Operation,
        ctx: &mut RunContext,
    ) -> Result<UndoState, Error> {
        match op.state {
            OperationState::Registered => {
                self.validate(&op.kind, &op.arguments)?;
                op.state = OperationState::Validated;
            }
            OperationState::Validated => {}
            OperationState::Executed | OperationState::Committed | OperationState::Undone => {
                return Err(OperationError::failed(
                    op.name(),
                    format!("cannot execute an operation that is {}", op.state),
                )
                .into());
            }
        }

        let args = op
            .arguments
            .iter()
            .map(|a| ctx.substitute(a))
            .collect::<Result<Vec<_>, _>>()?;
        if op.requires_elevation {
            ctx.ensure_elevated(op.name(), false).await?;
        }
        ctx.set_component(op.component.clone());

        tracing::debug!(operation = %op, component = ?op.component, "executing");
        let state = match &op.kind {
            OperationKind::Custom(name) => {
                let data = self.custom(name)?.execute(&args, ctx).await?;
                UndoState::Custom {
                    data: json!({ "arguments": args, "data": data }),
                }
            }
            kind => kinds::execute(kind, &args, ctx).await?,
        };

        op.backup_files = state.backups();
        op.undo = Some(state.clone());
        op.state = OperationState::Executed;
        Ok(state)
    }

    /// Reverse an executed or committed operation
    ///
    /// # Errors
    ///
    /// `AlreadyUndone`, `NotExecuted`, elevation errors, or whatever the
    /// restore hit. The operation stays in its state on failure.
    pub async fn undo(&self, op: &mut Operation, ctx: &mut RunContext) -> Result<(), Error> {
        match op.state {
            OperationState::Undone => {
                return Err(OperationError::AlreadyUndone {
                    operation: op.to_string(),
                }
                .into())
            }
            OperationState::Registered | OperationState::Validated => {
                return Err(OperationError::NotExecuted {
                    operation: op.to_string(),
                }
                .into())
            }
            OperationState::Executed | OperationState::Committed => {}
        }
        let Some(state) = op.undo.clone() else {
            return Err(OperationError::NotExecuted {
                operation: op.to_string(),
            }
            .into());
        };
        if op.requires_elevation {
            ctx.ensure_elevated(op.name(), false).await?;
        }
        ctx.set_component(op.component.clone());

        tracing::debug!(operation = %op, component = ?op.component, "undoing");
        match (&op.kind, &state) {
            (OperationKind::Custom(name), UndoState::Custom { data }) => {
                let args: Vec<String> = data
                    .get("arguments")
                    .cloned()
                    .map(serde_json::from_value::<Vec<String>>)
                    .transpose()?
                    .unwrap_or_default();
                let inner = data.get("data").unwrap_or(&serde_json::Value::Null);
                self.custom(name)?.undo(&args, inner, ctx).await?;
            }
            _ => kinds::undo(&state, ctx).await?,
        }

        op.state = OperationState::Undone;
        Ok(())
    }

    /// Make an executed operation permanent by deleting its backups
    ///
    /// Undo stays possible afterwards, but only removes what was created.
    pub async fn commit(&self, op: &mut Operation) {
        if op.state != OperationState::Executed {
            return;
        }
        for entry in op.backup_files.drain(..) {
            if let Err(e) = discard(&entry.backup).await {
                tracing::warn!(backup = %entry.backup.display(), error = %e, "could not delete backup");
            }
        }
        if let Some(state) = op.undo.as_mut() {
            state.forget_backups();
        }
        op.state = OperationState::Committed;
    }
}
