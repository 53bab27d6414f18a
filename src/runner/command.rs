//! Shell command execution for config tasks

use crate::config::{Command, CommandDetail};
use crate::error::{BuidlError, ExecutionError};
use crate::runner::interpolate::interpolate;
use crate::runner::params::TaskArguments;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command as ProcessCommand;

/// Interpreter used when the config doesn't name one
pub fn default_interpreter() -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string()]
}

/// Where and how config task commands are run
#[derive(Debug, Clone)]
pub struct Shell {
    pub working_dir: PathBuf,
    pub interpreter: Vec<String>,
}

impl Shell {
    pub fn new(working_dir: PathBuf) -> Self {
        Shell {
            working_dir,
            interpreter: default_interpreter(),
        }
    }

    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        if !interpreter.is_empty() {
            self.interpreter = interpreter;
        }
        self
    }

    /// Run one command with the task arguments interpolated and exported
    pub async fn execute(&self, cmd: &Command, args: &TaskArguments) -> Result<(), BuidlError> {
        let (exec, print, quiet, dir) = match cmd {
            Command::Simple(exec) => (exec.as_str(), exec.as_str(), false, None),
            Command::Complex(CommandDetail {
                exec,
                print,
                quiet,
                dir,
            }) => (
                exec.as_str(),
                print.as_deref().unwrap_or(exec.as_str()),
                *quiet,
                dir.as_deref(),
            ),
        };

        let exec_str = interpolate(exec, args)?;

        if !quiet {
            let print_str = interpolate(print, args).unwrap_or_else(|_| print.to_string());
            tracing::info!(command = %print_str, "running command");
        }

        let working_dir = match dir {
            Some(dir) => self.working_dir.join(interpolate(dir, args)?),
            None => self.working_dir.clone(),
        };

        let program = &self.interpreter[0];
        let mut command = ProcessCommand::new(program);
        command
            .args(&self.interpreter[1..])
            .arg(&exec_str)
            .current_dir(&working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        for (key, value) in args {
            command.env(key, value.to_string());
        }

        let status = command.status().await.map_err(|e| ExecutionError::Spawn {
            program: program.clone(),
            error: e.to_string(),
        })?;

        if !status.success() {
            return Err(ExecutionError::CommandFailed(status.code()).into());
        }

        Ok(())
    }
}
