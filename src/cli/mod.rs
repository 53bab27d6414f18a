//! CLI interface and argument parsing
//!
//! The command is built at runtime from the registered tasks, so tasks
//! declared in `buidl.yml` show up as subcommands.

pub mod app;
pub mod logging;

pub use app::*;
pub use logging::{init_tracing, Verbosity};
