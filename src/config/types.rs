//! Core configuration types
//!
//! `UserConfig` mirrors what a `buidl.yml` file may contain, every field
//! optional. `BuidlConfig` is the resolved configuration handed to tasks:
//! user values laid over the defaults, with all paths absolute.

use crate::runner::params::{ArgValue, ParamType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Solidity compiler version used when the config doesn't pick one
pub const DEFAULT_SOLC_VERSION: &str = "0.4.24";

/// Resolved project configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuidlConfig {
    pub paths: ProjectPaths,
    pub solc: SolcConfig,
    pub networks: BTreeMap<String, NetworkConfig>,

    /// Interpreter for user scripts and task commands (e.g. ["bash", "-c"])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,

    /// Tasks declared in the config file
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tasks: HashMap<String, TaskConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub config_file: PathBuf,
    pub sources: PathBuf,
    pub cache: PathBuf,
    pub artifacts: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolcConfig {
    pub version: String,
    pub optimizer: OptimizerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_optimizer_runs")]
    pub runs: u32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            enabled: false,
            runs: default_optimizer_runs(),
        }
    }
}

fn default_optimizer_runs() -> u32 {
    200
}

/// A network the project can deploy to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(flatten)]
    pub kind: NetworkKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NetworkKind {
    /// A node reachable over JSON-RPC
    Http(HttpNetworkConfig),
    /// An in-process development chain
    Auto(AutoNetworkConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpNetworkConfig {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl HttpNetworkConfig {
    pub fn url(&self) -> String {
        let host = if self.host.contains("://") {
            self.host.clone()
        } else {
            format!("http://{}", self.host)
        };
        match self.port {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoNetworkConfig {
    #[serde(default)]
    pub accounts: Vec<AutoNetworkAccount>,

    #[serde(default = "default_block_gas_limit")]
    pub block_gas_limit: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ganache_options: Option<GanacheOptions>,
}

pub fn default_block_gas_limit() -> u64 {
    7_500_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoNetworkAccount {
    pub private_key: String,
    pub balance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanacheOptions {
    pub gas_limit: u64,
    pub network_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<GanacheAccount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GanacheAccount {
    pub balance: String,
    pub secret_key: String,
}

/// Contents of a `buidl.yml` file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    #[serde(default)]
    pub paths: UserPaths,

    #[serde(default)]
    pub solc: UserSolcConfig,

    /// Merged over the default networks, same names replace them
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,

    #[serde(default)]
    pub tasks: HashMap<String, TaskConfig>,
}

/// Paths relative to the project root
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UserPaths {
    pub sources: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    pub artifacts: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UserSolcConfig {
    pub version: Option<String>,
    pub optimizer: Option<OptimizerConfig>,
}

/// A task declared in the config file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TaskConfig {
    /// Description for help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Hide the task from help
    #[serde(default)]
    pub internal: bool,

    /// Parameters, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamConfig>,

    /// Steps to execute
    #[serde(default, deserialize_with = "deserialize_run_items")]
    pub run: Vec<Run>,

    /// Load the task definition from another file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParamConfig {
    pub name: String,

    #[serde(default)]
    pub kind: ParamKindConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ArgValue>,

    #[serde(rename = "type", default)]
    pub param_type: ParamType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKindConfig {
    Positional,
    Flag,
    #[default]
    Optional,
}

/// A run step - a shell command, or a structured item
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Run {
    /// Simple string command
    SimpleCommand(String),

    /// Complex run item
    Complex(RunItem),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunItem {
    /// Commands to execute
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_commands"
    )]
    pub command: Vec<Command>,

    /// Tasks to invoke through the runtime environment
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_subtasks"
    )]
    pub task: Vec<SubTask>,

    /// Run the previous definition of this task
    #[serde(rename = "super", default)]
    pub run_super: bool,
}

/// A command to execute
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Command {
    Simple(String),
    Complex(CommandDetail),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CommandDetail {
    /// The command to execute
    pub exec: String,

    /// What to print when running (defaults to exec)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print: Option<String>,

    /// Whether to suppress the echo of the command
    #[serde(default)]
    pub quiet: bool,

    /// Working directory, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

/// A task invoked from a config task
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SubTask {
    Simple(String),
    Complex(SubTaskDetail),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubTaskDetail {
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, ArgValue>,
}

impl SubTask {
    pub fn name(&self) -> &str {
        match self {
            SubTask::Simple(name) => name,
            SubTask::Complex(detail) => &detail.name,
        }
    }
}

/// Accept either a single run step or a list of them
fn deserialize_run_items<'de, D>(deserializer: D) -> Result<Vec<Run>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(vec![Run::SimpleCommand(s)]),
        Value::Mapping(_) => {
            let run = Run::deserialize(value).map_err(D::Error::custom)?;
            Ok(vec![run])
        }
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|item| Run::deserialize(item).map_err(D::Error::custom))
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("run must be a string, object, or array")),
    }
}

fn deserialize_commands<'de, D>(deserializer: D) -> Result<Vec<Command>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(vec![Command::Simple(s)]),
        Value::Mapping(_) => {
            let cmd = Command::deserialize(value).map_err(D::Error::custom)?;
            Ok(vec![cmd])
        }
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|item| Command::deserialize(item).map_err(D::Error::custom))
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("command must be a string, object, or array")),
    }
}

fn deserialize_subtasks<'de, D>(deserializer: D) -> Result<Vec<SubTask>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(vec![SubTask::Simple(s)]),
        Value::Mapping(_) => {
            let task = SubTask::deserialize(value).map_err(D::Error::custom)?;
            Ok(vec![task])
        }
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|item| SubTask::deserialize(item).map_err(D::Error::custom))
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("task must be a string, object, or array")),
    }
}
