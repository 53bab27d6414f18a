//! The `help` task

use super::TASK_HELP;
use crate::error::Result;
use crate::runner::params::{ParamKind, ParamSpec};
use crate::runner::registry::{OverrideChain, TaskRegistry};
use colored::Colorize;
use serde_json::{json, Value};

pub(super) fn register(registry: &mut TaskRegistry) -> Result<()> {
    registry
        .task(TASK_HELP, "Prints the available tasks, or the parameters of one task")
        .add_positional_param("task", "The task to describe", Some("".into()))
        .set_action(|args, env, _| async move {
            let task = args.get("task").map(ToString::to_string).unwrap_or_default();

            if task.is_empty() {
                println!("{}", task_list(env.registry()));
                let names: Vec<&str> = env.registry().public_tasks().map(|c| c.name()).collect();
                return Ok(json!(names));
            }

            let chain = env.registry().get(&task)?;
            println!("{}", task_usage(chain));
            Ok(Value::String(chain.name().to_string()))
        })
}

/// Public tasks with their descriptions, one per line
pub fn task_list(registry: &TaskRegistry) -> String {
    let width = registry
        .public_tasks()
        .map(|c| c.name().len())
        .max()
        .unwrap_or(0);

    let mut out = format!("{}\n", "AVAILABLE TASKS:".bold());
    for chain in registry.public_tasks() {
        out.push_str(&format!(
            "\n  {:width$}  {}",
            chain.name().green(),
            chain.description(),
            width = width
        ));
    }
    out
}

/// Usage line and parameter list of one task
pub fn task_usage(chain: &OverrideChain) -> String {
    let mut usage = format!("buidl {}", chain.name());
    for spec in chain.schema().iter() {
        usage.push(' ');
        usage.push_str(&usage_fragment(spec));
    }

    let mut out = format!("{}\n\n{}", usage.bold(), chain.description());
    if !chain.schema().is_empty() {
        out.push_str(&format!("\n\n{}\n", "PARAMETERS:".bold()));
        for spec in chain.schema().iter() {
            out.push_str(&format!("\n  {}  {}", param_label(spec).green(), spec.description));
            if let Some(default) = spec.default().filter(|d| !d.to_string().is_empty()) {
                out.push_str(&format!(" (default: {})", default));
            }
        }
    }
    out
}

fn param_label(spec: &ParamSpec) -> String {
    match spec.kind {
        ParamKind::Positional { .. } => spec.name.clone(),
        _ => format!("--{}", spec.cli_name()),
    }
}

fn usage_fragment(spec: &ParamSpec) -> String {
    match &spec.kind {
        ParamKind::Positional { default: None } => spec.name.clone(),
        ParamKind::Positional { default: Some(_) } => format!("[{}]", spec.name),
        ParamKind::Flag => format!("[--{}]", spec.cli_name()),
        ParamKind::Optional { .. } => {
            format!("[--{} <{}>]", spec.cli_name(), spec.param_type.to_string().to_uppercase())
        }
    }
}
