#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Reversible installer operations
//!
//! Every operation backs up what it is about to overwrite or delete before
//! touching it, and records an [`UndoState`] describing how to reverse
//! itself. The installer keeps executed operations in a log and undoes it
//! tail to head when a run fails or is cancelled.

mod backup;
mod context;
mod kind;
mod kinds;
mod operation;
mod registry;
mod script;

pub use context::{RunContext, APPLICATION_NAME_KEY, HOME_DIR_KEY, TARGET_DIR_KEY};
pub use kind::OperationKind;
pub use operation::{BackupEntry, Operation, OperationState, UndoState, ADMIN_VALUE};
pub use registry::OperationRegistry;
pub use script::{ComponentScript, CustomOperation, ScriptHost, ScriptRegistry};
