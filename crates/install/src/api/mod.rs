//! Public configuration and per-run context types

pub mod config;
pub mod context;
