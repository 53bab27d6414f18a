//! Buidl - a task runner for smart-contract projects
//!
//! Tasks are registered by name. Registering a name again stacks an
//! override on top of the previous definition, and the override can still
//! run what it replaced. Tasks run inside a shared runtime environment that
//! can be published to a global scope for user scripts.

pub mod builtin;
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;

pub use error::{BuidlError, Result};

/// Current version of Buidl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
