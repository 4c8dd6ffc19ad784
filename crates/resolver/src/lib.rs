#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Component dependency resolution
//!
//! Expands a user selection into a consistent, cycle-free, ordered plan:
//! explicit dependencies transitively, auto-dependencies to a fixpoint,
//! forced components always. Resolution is a pure synchronous function of
//! the known components and the request.

mod graph;
mod plan;
mod resolver;

pub use graph::DependencyGraph;
pub use plan::{InstallReason, Plan, PlanEntry, ResolveRequest};
pub use resolver::resolve;
