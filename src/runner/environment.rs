//! Runtime environment shared by every task of one invocation
//!
//! The environment is built once, after all tasks are registered, and
//! handed to every action. Cloning it is cheap and yields the same
//! environment, never a new one.

use crate::config::BuidlConfig;
use crate::error::{BuidlError, Result};
use crate::runner::chain::TaskValue;
use crate::runner::global::{self, GlobalScope};
use crate::runner::params::TaskArguments;
use crate::runner::registry::TaskRegistry;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Network used when none is given on the command line
pub const DEFAULT_NETWORK: &str = "auto";

/// Global command-line arguments, shared by every task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalArguments {
    pub network: String,
    pub verbose: bool,
    pub show_stack_traces: bool,
    pub config: Option<PathBuf>,
}

impl Default for GlobalArguments {
    fn default() -> Self {
        GlobalArguments {
            network: DEFAULT_NETWORK.to_string(),
            verbose: false,
            show_stack_traces: false,
            config: None,
        }
    }
}

/// Compiled contract, as written to the artifacts directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub abi: serde_json::Value,
    pub bytecode: String,
}

/// Access to compiled artifacts.
///
/// Artifacts produced during this run are kept in memory, anything else is
/// read from `<artifacts>/<Contract>.json`.
#[derive(Clone)]
pub struct Artifacts {
    dir: PathBuf,
    loaded: Arc<RwLock<BTreeMap<String, Artifact>>>,
}

impl Artifacts {
    pub fn new(dir: PathBuf) -> Self {
        Artifacts {
            dir,
            loaded: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, contract_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", contract_name))
    }

    /// Keep an artifact in memory without touching the disk
    pub fn insert(&self, artifact: Artifact) {
        self.loaded
            .write()
            .insert(artifact.contract_name.clone(), artifact);
    }

    /// Write an artifact to the artifacts directory and keep it in memory
    pub async fn persist(&self, artifact: Artifact) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(&artifact)?;
        tokio::fs::write(self.path_for(&artifact.contract_name), json).await?;
        self.insert(artifact);
        Ok(())
    }

    pub async fn require(&self, contract_name: &str) -> Result<Artifact> {
        if let Some(artifact) = self.loaded.read().get(contract_name) {
            return Ok(artifact.clone());
        }

        let path = self.path_for(contract_name);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BuidlError::ArtifactNotFound(contract_name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let artifact: Artifact = serde_json::from_str(&contents)?;
        self.insert(artifact.clone());
        Ok(artifact)
    }
}

struct EnvInner {
    config: BuidlConfig,
    arguments: GlobalArguments,
    registry: Arc<TaskRegistry>,
    artifacts: Artifacts,
}

/// The context every task runs in
#[derive(Clone)]
pub struct RuntimeEnvironment {
    inner: Arc<EnvInner>,
}

impl RuntimeEnvironment {
    pub fn builder(config: BuidlConfig, registry: TaskRegistry) -> EnvironmentBuilder {
        EnvironmentBuilder {
            config,
            registry,
            arguments: GlobalArguments::default(),
            artifacts: None,
        }
    }

    pub fn config(&self) -> &BuidlConfig {
        &self.inner.config
    }

    pub fn arguments(&self) -> &GlobalArguments {
        &self.inner.arguments
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.inner.artifacts
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.inner.registry
    }

    /// Whether both handles refer to the same environment
    pub fn ptr_eq(&self, other: &RuntimeEnvironment) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Invoke a task by name.
    ///
    /// The override chain is resolved and the arguments validated on every
    /// call; this is how actions run other tasks, including themselves.
    pub async fn run(&self, name: &str, args: TaskArguments) -> Result<TaskValue> {
        let chain = self.inner.registry.get(name)?;
        let args = chain.schema().validate(name, args)?;
        let resolved = chain.resolve();

        tracing::debug!(task = name, layers = resolved.depth(), "running task");
        let result = resolved.invoke(args, self.clone()).await;

        match result {
            Ok(value) => {
                tracing::debug!(task = name, "task completed");
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(task = name, error = %e, "task failed");
                Err(e.in_task(name))
            }
        }
    }

    /// Invoke a task without arguments
    pub async fn run_task(&self, name: &str) -> Result<TaskValue> {
        self.run(name, TaskArguments::new()).await
    }

    /// Publish this environment to the process-wide global scope
    pub fn inject_to_global(&self) {
        self.inject_into(global::global_scope());
    }

    /// Publish this environment to a given scope
    pub fn inject_into(&self, scope: &GlobalScope) {
        scope.inject(self);
    }
}

/// Assembles a [`RuntimeEnvironment`]
pub struct EnvironmentBuilder {
    config: BuidlConfig,
    registry: TaskRegistry,
    arguments: GlobalArguments,
    artifacts: Option<Artifacts>,
}

impl EnvironmentBuilder {
    pub fn with_arguments(mut self, arguments: GlobalArguments) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_artifacts(mut self, artifacts: Artifacts) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Freeze the registry and build the environment
    pub fn build(self) -> RuntimeEnvironment {
        let artifacts = self
            .artifacts
            .unwrap_or_else(|| Artifacts::new(self.config.paths.artifacts.clone()));

        RuntimeEnvironment {
            inner: Arc::new(EnvInner {
                config: self.config,
                arguments: self.arguments,
                registry: self.registry.freeze(),
                artifacts,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuidlConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn env_in(dir: &Path) -> RuntimeEnvironment {
        let config = BuidlConfig::with_root(dir.to_path_buf());
        RuntimeEnvironment::builder(config, TaskRegistry::new()).build()
    }

    #[test]
    fn test_clones_are_the_same_environment() {
        let temp_dir = TempDir::new().unwrap();
        let env = env_in(temp_dir.path());
        let other = env_in(temp_dir.path());

        assert!(env.ptr_eq(&env.clone()));
        assert!(!env.ptr_eq(&other));
        assert_eq!(env.arguments().network, DEFAULT_NETWORK);
    }

    #[tokio::test]
    async fn test_artifacts_persist_and_require() {
        let temp_dir = TempDir::new().unwrap();
        let env = env_in(temp_dir.path());

        let artifact = Artifact {
            contract_name: "Token".to_string(),
            abi: json!([]),
            bytecode: "0x6080".to_string(),
        };
        env.artifacts().persist(artifact.clone()).await.unwrap();
        assert!(temp_dir.path().join("artifacts/Token.json").exists());

        // A fresh accessor reads from disk
        let fresh = Artifacts::new(temp_dir.path().join("artifacts"));
        assert_eq!(fresh.require("Token").await.unwrap(), artifact);
    }

    #[tokio::test]
    async fn test_missing_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let env = env_in(temp_dir.path());

        let result = env.artifacts().require("Nope").await;
        assert!(matches!(result, Err(BuidlError::ArtifactNotFound(name)) if name == "Nope"));
    }
}
