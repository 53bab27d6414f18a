//! Tasks declared in `buidl.yml`
//!
//! Each config task becomes one definition in the registry. When a task of
//! the same name already exists (a built-in, or one defined in code) the
//! config task overrides it and can reach it with a `super` step.
//!
//! ```yaml
//! tasks:
//!   compile:
//!     params:
//!       - name: target
//!         kind: optional
//!         default: all
//!     run:
//!       - echo "compiling ${target}"
//!       - super: true
//!       - task: { name: report, args: { format: short } }
//! ```

use crate::config::{BuidlConfig, ParamKindConfig, Run, SubTask, TaskConfig};
use crate::error::Result;
use crate::runner::chain::RunSuper;
use crate::runner::command::Shell;
use crate::runner::environment::RuntimeEnvironment;
use crate::runner::interpolate::interpolate_args;
use crate::runner::params::{ParamSpec, TaskArguments};
use crate::runner::registry::TaskRegistry;
use serde_json::Value;
use std::sync::Arc;

/// Register every task of the config, in name order
pub fn register_config_tasks(registry: &mut TaskRegistry, config: &BuidlConfig) -> Result<()> {
    let shell = Shell::new(config.paths.root.clone())
        .with_interpreter(config.interpreter.clone().unwrap_or_default());

    let mut names: Vec<&String> = config.tasks.keys().collect();
    names.sort();

    for name in names {
        register_config_task(registry, name, &config.tasks[name], shell.clone())?;
    }
    Ok(())
}

pub fn register_config_task(
    registry: &mut TaskRegistry,
    name: &str,
    task: &TaskConfig,
    shell: Shell,
) -> Result<()> {
    let description = task.description.clone().unwrap_or_default();
    let mut builder = registry.define(name, &description, task.internal);

    for param in &task.params {
        let description = param.description.clone().unwrap_or_default();
        let spec = match param.kind {
            ParamKindConfig::Positional => {
                ParamSpec::positional(&param.name, &description, param.default.clone())
            }
            ParamKindConfig::Flag => ParamSpec::flag(&param.name, &description),
            ParamKindConfig::Optional => {
                ParamSpec::optional(&param.name, &description, param.default.clone())
            }
        };
        builder = builder.add_param(spec.with_type(param.param_type));
    }

    let steps: Arc<[Run]> = Arc::from(task.run.clone());
    let shell = Arc::new(shell);
    let task_name = name.to_string();

    builder.set_action(move |args, env, run_super| {
        let steps = steps.clone();
        let shell = shell.clone();
        let task_name = task_name.clone();
        async move { run_steps(&task_name, &steps, &shell, args, env, run_super).await }
    })
}

/// Execute the steps in order. The result is that of the last super-call,
/// or null when the task never delegates.
async fn run_steps(
    task_name: &str,
    steps: &[Run],
    shell: &Shell,
    args: TaskArguments,
    env: RuntimeEnvironment,
    run_super: RunSuper,
) -> Result<Value> {
    let mut result = Value::Null;

    for step in steps {
        match step {
            Run::SimpleCommand(cmd) => {
                shell
                    .execute(&crate::config::Command::Simple(cmd.clone()), &args)
                    .await?;
            }
            Run::Complex(item) => {
                for cmd in &item.command {
                    shell.execute(cmd, &args).await?;
                }

                if item.run_super {
                    tracing::debug!(task = task_name, "config task delegating to super");
                    result = run_super.call().await?;
                }

                for subtask in &item.task {
                    let sub_args = match subtask {
                        SubTask::Simple(_) => TaskArguments::new(),
                        SubTask::Complex(detail) => interpolate_args(&detail.args, &args)?,
                    };
                    env.run(subtask.name(), sub_args).await?;
                }
            }
        }
    }

    Ok(result)
}
