//! Task execution engine
//!
//! Tasks are registered into a [`TaskRegistry`], frozen, and run through a
//! [`RuntimeEnvironment`]. Redefining a task name stacks an override on top
//! of the previous definition instead of replacing it.

pub mod chain;
pub mod command;
pub mod config_task;
pub mod environment;
pub mod global;
pub mod interpolate;
pub mod params;
pub mod registry;

pub use chain::{action, Action, ResolvedTask, RunSuper, TaskValue};
pub use command::Shell;
pub use config_task::register_config_tasks;
pub use environment::{Artifact, Artifacts, GlobalArguments, RuntimeEnvironment, DEFAULT_NETWORK};
pub use global::{ambient_env, global_scope, GlobalScope};
pub use params::{ArgValue, ParamKind, ParamSchema, ParamSpec, ParamType, TaskArguments};
pub use registry::{OverrideChain, TaskBuilder, TaskDefinition, TaskRegistry};
