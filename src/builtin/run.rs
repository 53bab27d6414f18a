//! The `run` task and its setup hook

use super::script::ScriptHost;
use super::{TASK_COMPILE, TASK_RUN, TASK_SETUP_RUN_ENVIRONMENT};
use crate::error::{BuidlError, Result};
use crate::runner::environment::RuntimeEnvironment;
use crate::runner::params::TaskArguments;
use crate::runner::registry::TaskRegistry;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub(super) fn register(registry: &mut TaskRegistry, host: Arc<dyn ScriptHost>) -> Result<()> {
    // Overridable hook, run right before a script is loaded
    registry
        .internal_task(
            TASK_SETUP_RUN_ENVIRONMENT,
            "Publishes the runtime environment to the global scope",
        )
        .set_action(|_, env, _| async move {
            env.inject_to_global();
            Ok(Value::Null)
        })?;

    registry
        .task(TASK_RUN, "Runs a user-defined script after compiling the project")
        .add_positional_param("script", "A script to be run within buidl's environment", None)
        .add_flag("noCompile", "Don't compile before running this task")
        .set_action(move |args, env, _| {
            let host = host.clone();
            async move { run_script(host.as_ref(), args, env).await }
        })
}

async fn run_script(host: &dyn ScriptHost, args: TaskArguments, env: RuntimeEnvironment) -> Result<Value> {
    let script = PathBuf::from(
        args.get("script")
            .map(ToString::to_string)
            .unwrap_or_default(),
    );
    let no_compile = args
        .get("noCompile")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    if !tokio::fs::try_exists(&script).await.unwrap_or(false) {
        return Err(BuidlError::TaskRunFileNotFound(script));
    }

    if !no_compile {
        env.run_task(TASK_COMPILE).await?;
    }

    tracing::info!(script = %script.display(), network = %env.arguments().network, "running script");

    let outcome = load_and_execute(host, &script, &env).await;

    match outcome {
        Ok(()) => Ok(Value::Null),
        Err(error) => Err(BuidlError::TaskRunScriptError {
            script,
            message: error.to_string(),
        }),
    }
}

async fn load_and_execute(
    host: &dyn ScriptHost,
    script: &Path,
    env: &RuntimeEnvironment,
) -> anyhow::Result<()> {
    env.run_task(TASK_SETUP_RUN_ENVIRONMENT).await?;
    let path = tokio::fs::canonicalize(script).await?;

    AssertUnwindSafe(host.execute(&path, env))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(anyhow::anyhow!(panic_message(panic))))
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "script panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(42)), "script panicked");
    }
}
