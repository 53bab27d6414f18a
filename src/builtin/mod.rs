//! Built-in tasks
//!
//! Registered before any config-declared task, so a project can override
//! each of them and still reach the built-in behavior through `super`.

pub mod compile;
pub mod help;
pub mod run;
pub mod script;

pub use compile::{Compiler, SolcCompiler};
pub use script::{FnScriptHost, ProcessScriptHost, ScriptHost};

use crate::config::BuidlConfig;
use crate::error::Result;
use crate::runner::registry::TaskRegistry;
use serde_json::json;
use std::sync::Arc;

pub const TASK_COMPILE: &str = "compile";
pub const TASK_RUN: &str = "run";
pub const TASK_HELP: &str = "help";
pub const TASK_SETUP_RUN_ENVIRONMENT: &str = "builtin:setup-run-environment";

/// External services the built-in tasks depend on
#[derive(Clone)]
pub struct Collaborators {
    pub compiler: Arc<dyn Compiler>,
    pub script_host: Arc<dyn ScriptHost>,
}

impl Default for Collaborators {
    /// Shells out to `solc` and runs scripts as child processes
    fn default() -> Self {
        Collaborators {
            compiler: Arc::new(SolcCompiler::default()),
            script_host: Arc::new(ProcessScriptHost::new()),
        }
    }
}

impl Collaborators {
    /// The default collaborators, with scripts run by the configured
    /// interpreter when there is one
    pub fn for_config(config: &BuidlConfig) -> Self {
        let mut collaborators = Collaborators::default();
        if let Some(interpreter) = &config.interpreter {
            let host = ProcessScriptHost::with_interpreter(interpreter.clone());
            collaborators.script_host = Arc::new(host);
        }
        collaborators
    }
}

/// Register every built-in task
pub fn register_builtins(registry: &mut TaskRegistry, collaborators: Collaborators) -> Result<()> {
    let compiler = collaborators.compiler;
    registry
        .task(TASK_COMPILE, "Compiles the entire project, building all artifacts")
        .set_action(move |_, env, _| {
            let compiler = compiler.clone();
            async move {
                let names =
                    compile::compile_project(compiler.as_ref(), env.config(), env.artifacts()).await?;
                Ok(json!(names))
            }
        })?;

    run::register(registry, collaborators.script_host)?;
    help::register(registry)?;

    Ok(())
}
