//! Component scripts and script-defined operations
//!
//! A script never sees the installer itself. It gets a [`ScriptHost`] that
//! can register operations for its component and read or write installer
//! values, nothing more.

use crate::context::RunContext;
use crate::operation::Operation;
use crate::registry::OperationRegistry;
use async_trait::async_trait;
use ifw_errors::{Arity, Error, OperationError};
use ifw_types::{Component, OperationDescriptor};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Capability handed to a [`ComponentScript`]
pub trait ScriptHost: Send {
    /// Queue an operation for the component being prepared
    ///
    /// # Errors
    ///
    /// Validation errors for unknown names or a wrong argument count.
    fn register_operation(&mut self, descriptor: OperationDescriptor) -> Result<(), Error>;

    /// Like [`Self::register_operation`], flagged as needing elevation
    ///
    /// # Errors
    ///
    /// See [`Self::register_operation`].
    fn register_elevated_operation(&mut self, descriptor: OperationDescriptor)
        -> Result<(), Error>;

    fn read_value(&self, key: &str) -> Option<String>;

    fn write_value(&mut self, key: &str, value: &str);
}

/// Per-component installation logic beyond the declarative operation list
#[async_trait]
pub trait ComponentScript: Send + Sync {
    /// Register the component's operations through `host`
    ///
    /// # Errors
    ///
    /// Any error aborts preparation of the run.
    async fn create_operations(
        &self,
        component: &Component,
        host: &mut dyn ScriptHost,
    ) -> Result<(), Error>;
}

/// Implementation behind a script-registered operation name
#[async_trait]
pub trait CustomOperation: Send + Sync {
    /// Accepted argument counts; `None` accepts anything
    fn arity(&self) -> Option<Arity> {
        None
    }

    /// Perform the operation and return whatever undo will need
    ///
    /// # Errors
    ///
    /// Any error fails the operation and unwinds the run.
    async fn execute(
        &self,
        args: &[String],
        ctx: &mut RunContext,
    ) -> Result<serde_json::Value, Error>;

    /// Reverse [`Self::execute`] given its returned data
    ///
    /// # Errors
    ///
    /// Reported by the caller, which keeps undoing the rest.
    async fn undo(
        &self,
        args: &[String],
        data: &serde_json::Value,
        ctx: &mut RunContext,
    ) -> Result<(), Error>;
}

/// Scripts by the name components refer to in their `Script` element
#[derive(Clone, Default)]
pub struct ScriptRegistry {
    scripts: HashMap<String, Arc<dyn ComponentScript>>,
}

impl fmt::Debug for ScriptRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.scripts.keys().collect();
        names.sort();
        f.debug_struct("ScriptRegistry").field("scripts", &names).finish()
    }
}

impl ScriptRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, script: Arc<dyn ComponentScript>) {
        self.scripts.insert(name.into(), script);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ComponentScript>> {
        self.scripts.get(name)
    }

    /// Declared operations of `component` followed by whatever its script
    /// registers
    ///
    /// # Errors
    ///
    /// Validation errors, or `ScriptFailed` when the component names a
    /// script that is not registered or the script fails.
    pub async fn collect_operations(
        &self,
        component: &Component,
        registry: &OperationRegistry,
        ctx: &mut RunContext,
    ) -> Result<Vec<Operation>, Error> {
        let mut host = OperationCollector {
            registry,
            ctx,
            component: component.name.clone(),
            operations: Vec::new(),
        };
        for descriptor in &component.operations {
            host.register_operation(descriptor.clone())?;
        }

        if let Some(name) = &component.script {
            let script = self.get(name).ok_or_else(|| OperationError::ScriptFailed {
                component: component.name.clone(),
                message: format!("script '{name}' is not available"),
            })?;
            script
                .create_operations(component, &mut host)
                .await
                .map_err(|e| match e {
                    Error::Validation(_) | Error::Cancelled => e,
                    other => OperationError::ScriptFailed {
                        component: component.name.clone(),
                        message: other.to_string(),
                    }
                    .into(),
                })?;
        }
        Ok(host.operations)
    }
}

/// [`ScriptHost`] that validates and collects operations for one component
struct OperationCollector<'a> {
    registry: &'a OperationRegistry,
    ctx: &'a mut RunContext,
    component: String,
    operations: Vec<Operation>,
}

impl ScriptHost for OperationCollector<'_> {
    fn register_operation(&mut self, descriptor: OperationDescriptor) -> Result<(), Error> {
        let op = self.registry.create(&descriptor, Some(&self.component))?;
        self.operations.push(op);
        Ok(())
    }

    fn register_elevated_operation(
        &mut self,
        descriptor: OperationDescriptor,
    ) -> Result<(), Error> {
        let op = self.registry.create(&descriptor, Some(&self.component))?;
        self.operations.push(op.elevated());
        Ok(())
    }

    fn read_value(&self, key: &str) -> Option<String> {
        self.ctx.value(key).map(str::to_string)
    }

    fn write_value(&mut self, key: &str, value: &str) {
        self.ctx.set_value(key, value);
    }
}
