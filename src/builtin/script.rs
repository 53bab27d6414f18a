//! Loading and executing user scripts
//!
//! The `run` task hands a resolved script path to a [`ScriptHost`]. The
//! default host runs the script as a child process; embedders and tests can
//! execute scripts in-process with [`FnScriptHost`].

use crate::config::NetworkKind;
use crate::runner::environment::RuntimeEnvironment;
use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Executes one user script
#[async_trait]
pub trait ScriptHost: Send + Sync {
    async fn execute(&self, script: &Path, env: &RuntimeEnvironment) -> anyhow::Result<()>;
}

/// Runs scripts as child processes.
///
/// The interpreter comes from the config when set, otherwise from the
/// script's extension. The child sees the selected network and the project
/// paths through `BUIDL_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct ProcessScriptHost {
    interpreter: Option<Vec<String>>,
}

impl ProcessScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every script with the given interpreter. The config names one
    /// for inline commands, so a trailing `-c` or `-e` is dropped and the
    /// script file is passed instead.
    pub fn with_interpreter(mut interpreter: Vec<String>) -> Self {
        let inline_flag = matches!(interpreter.last().map(String::as_str), Some("-c" | "-e"));
        if inline_flag && interpreter.len() > 1 {
            interpreter.pop();
        }
        ProcessScriptHost {
            interpreter: Some(interpreter).filter(|i| !i.is_empty()),
        }
    }

    fn command_for(&self, script: &Path) -> Command {
        let interpreter: Vec<String> = match &self.interpreter {
            Some(interpreter) => interpreter.clone(),
            None => match script.extension().and_then(|e| e.to_str()) {
                Some("sh") => vec!["sh".into()],
                Some("js") => vec!["node".into()],
                Some("py") => vec!["python3".into()],
                _ => Vec::new(),
            },
        };

        match interpreter.split_first() {
            Some((program, rest)) => {
                let mut command = Command::new(program);
                command.args(rest).arg(script);
                command
            }
            None => Command::new(script),
        }
    }
}

/// Environment variables describing the runtime environment to a child process
pub fn script_env_vars(env: &RuntimeEnvironment) -> Vec<(String, String)> {
    let config = env.config();
    let network = &env.arguments().network;

    let mut vars = vec![
        ("BUIDL_NETWORK".to_string(), network.clone()),
        ("BUIDL_ROOT".to_string(), path_var(&config.paths.root)),
        ("BUIDL_CONFIG".to_string(), path_var(&config.paths.config_file)),
        ("BUIDL_ARTIFACTS".to_string(), path_var(&config.paths.artifacts)),
    ];

    if let Some(NetworkKind::Http(http)) = config.networks.get(network).map(|n| &n.kind) {
        vars.push(("BUIDL_RPC_URL".to_string(), http.url()));
    }

    vars
}

fn path_var(path: &Path) -> String {
    path.display().to_string()
}

#[async_trait]
impl ScriptHost for ProcessScriptHost {
    async fn execute(&self, script: &Path, env: &RuntimeEnvironment) -> anyhow::Result<()> {
        let mut command = self.command_for(script);
        command
            .current_dir(&env.config().paths.root)
            .envs(script_env_vars(env))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to start {}", script.display()))?;

        // Forward stderr while keeping its last line as the failure message
        let mut last_line = None;
        if let Some(stderr) = child.stderr.take() {
            let mut lines = BufReader::new(stderr).lines();
            while let Some(line) = lines.next_line().await? {
                eprintln!("{}", line);
                if !line.trim().is_empty() {
                    last_line = Some(line);
                }
            }
        }

        let status = child.wait().await?;
        if status.success() {
            return Ok(());
        }

        Err(match last_line {
            Some(line) => anyhow!(line),
            None => match status.code() {
                Some(code) => anyhow!("script exited with status {}", code),
                None => anyhow!("script was terminated by a signal"),
            },
        })
    }
}

type ScriptFn =
    dyn Fn(PathBuf, RuntimeEnvironment) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// Executes scripts with a closure, in-process
pub struct FnScriptHost {
    f: Box<ScriptFn>,
}

impl FnScriptHost {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(PathBuf, RuntimeEnvironment) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        use futures::FutureExt;
        FnScriptHost {
            f: Box::new(move |path, env| f(path, env).boxed()),
        }
    }
}

#[async_trait]
impl ScriptHost for FnScriptHost {
    async fn execute(&self, script: &Path, env: &RuntimeEnvironment) -> anyhow::Result<()> {
        (self.f)(script.to_path_buf(), env.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuidlConfig;
    use crate::runner::environment::GlobalArguments;
    use crate::runner::registry::TaskRegistry;
    use tempfile::TempDir;

    fn env_with_network(dir: &TempDir, network: &str) -> RuntimeEnvironment {
        let config = BuidlConfig::with_root(dir.path().to_path_buf());
        let arguments = GlobalArguments {
            network: network.to_string(),
            ..GlobalArguments::default()
        };
        RuntimeEnvironment::builder(config, TaskRegistry::new())
            .with_arguments(arguments)
            .build()
    }

    #[test]
    fn test_script_env_vars() {
        let temp_dir = TempDir::new().unwrap();
        let env = env_with_network(&temp_dir, "develop");
        let vars = script_env_vars(&env);

        assert!(vars.contains(&("BUIDL_NETWORK".to_string(), "develop".to_string())));
        assert!(vars.contains(&("BUIDL_RPC_URL".to_string(), "http://127.0.0.1:8545".to_string())));

        let env = env_with_network(&temp_dir, "auto");
        assert!(!script_env_vars(&env).iter().any(|(k, _)| k == "BUIDL_RPC_URL"));
    }

    #[tokio::test]
    async fn test_process_host_runs_shell_script() {
        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("ok.sh");
        std::fs::write(&script, "echo $BUIDL_NETWORK > network.txt\n").unwrap();

        let env = env_with_network(&temp_dir, "develop");
        ProcessScriptHost::new().execute(&script, &env).await.unwrap();

        let network = std::fs::read_to_string(temp_dir.path().join("network.txt")).unwrap();
        assert_eq!(network.trim(), "develop");
    }

    #[tokio::test]
    async fn test_process_host_reports_last_stderr_line() {
        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("fail.sh");
        std::fs::write(&script, "echo 'Error: boom' >&2\nexit 2\n").unwrap();

        let env = env_with_network(&temp_dir, "auto");
        let err = ProcessScriptHost::new()
            .execute(&script, &env)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_process_host_with_interpreter() {
        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("deploy.txt");
        std::fs::write(&script, "touch deployed\n").unwrap();

        let env = env_with_network(&temp_dir, "auto");
        ProcessScriptHost::with_interpreter(vec!["sh".to_string()])
            .execute(&script, &env)
            .await
            .unwrap();
        assert!(temp_dir.path().join("deployed").exists());
    }

    #[tokio::test]
    async fn test_command_interpreter_runs_script_files() {
        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("deploy");
        std::fs::write(&script, "touch deployed\n").unwrap();

        let env = env_with_network(&temp_dir, "auto");
        ProcessScriptHost::with_interpreter(vec!["sh".to_string(), "-c".to_string()])
            .execute(&script, &env)
            .await
            .unwrap();
        assert!(temp_dir.path().join("deployed").exists());
    }

    #[tokio::test]
    async fn test_fn_host() {
        let temp_dir = TempDir::new().unwrap();
        let env = env_with_network(&temp_dir, "auto");
        let host = FnScriptHost::new(|path, _env| async move {
            Err(anyhow!("cannot load {}", path.display()))
        });

        let err = host.execute(Path::new("x.js"), &env).await.unwrap_err();
        assert!(err.to_string().contains("x.js"));
    }
}
