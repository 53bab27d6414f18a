//! Error types for buidl

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for buidl operations
pub type Result<T> = std::result::Result<T, BuidlError>;

/// Main error type for buidl
#[derive(Error, Debug)]
pub enum BuidlError {
    /// No definition was ever registered under this name
    #[error("Unrecognized task '{0}'")]
    UnknownTask(String),

    /// `RunSuper` was called from the first definition of a task
    #[error("Task '{0}' doesn't override a previous definition, there is nothing to run as super")]
    NoSuperTask(String),

    /// Argument validation failed before the task ran
    #[error("Parameter error: {0}")]
    Param(#[from] ParamError),

    /// A task definition broke the parameter rules
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Script {} doesn't exist", .0.display())]
    TaskRunFileNotFound(PathBuf),

    /// Anything thrown while loading or executing a user script
    #[error("Error running script {}: {message}", script.display())]
    TaskRunScriptError { script: PathBuf, message: String },

    /// An untyped failure raised inside a task's action
    #[error("Task '{task}' failed: {error}")]
    TaskFailed {
        task: String,
        #[source]
        error: anyhow::Error,
    },

    #[error("Artifact for contract '{0}' not found, did you compile the project?")]
    ArtifactNotFound(String),

    #[error("The runtime environment has not been injected into the global scope")]
    EnvironmentNotInjected,

    /// The command line couldn't be parsed
    #[error("{0}")]
    Usage(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Shell command execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Variable interpolation errors
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuidlError {
    /// Whether this error comes from inside a task body rather than from the
    /// task machinery. Such errors get wrapped with the task name when they
    /// cross the invocation boundary.
    pub fn is_task_local(&self) -> bool {
        matches!(
            self,
            BuidlError::Execution(_)
                | BuidlError::Interpolation(_)
                | BuidlError::Io(_)
                | BuidlError::Yaml(_)
                | BuidlError::Json(_)
                | BuidlError::Other(_)
        )
    }

    /// Errors the user can't act upon; the CLI prints their full cause chain.
    pub fn is_internal(&self) -> bool {
        matches!(self, BuidlError::Other(_))
    }

    /// Wrap a task-local error with the name of the task it escaped from.
    /// Already typed errors are returned unchanged.
    pub fn in_task(self, task: &str) -> Self {
        if self.is_task_local() {
            BuidlError::TaskFailed {
                task: task.to_string(),
                error: anyhow::Error::new(self),
            }
        } else {
            self
        }
    }
}

/// Argument validation errors, raised before an action runs
#[derive(Error, Debug)]
pub enum ParamError {
    #[error("Missing required argument '{param}' for task '{task}'")]
    MissingRequiredParam { task: String, param: String },

    #[error("Unrecognized argument '{param}' for task '{task}'")]
    UnrecognizedParam { task: String, param: String },

    #[error("Invalid value '{value}' for argument '{param}' of task '{task}', expected {expected}")]
    InvalidValue {
        task: String,
        param: String,
        value: String,
        expected: String,
    },
}

/// Errors in the shape of a task definition
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Parameter '{param}' is declared twice in task '{task}'")]
    DuplicateParam { task: String, param: String },

    #[error("Mandatory positional parameter '{param}' of task '{task}' can't follow an optional one")]
    RequiredAfterOptional { task: String, param: String },

    #[error("Task '{task}' overrides a previous definition and can't add positional parameter '{param}'")]
    PositionalOnOverride { task: String, param: String },

    #[error("Default value of parameter '{param}' in task '{task}' doesn't match its type")]
    InvalidDefault { task: String, param: String },

    #[error("Parameter '{param}' of task '{task}' clashes with the global option --{param}")]
    ReservedParam { task: String, param: String },
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid network '{name}': {reason}")]
    InvalidNetwork { name: String, reason: String },

    #[error("Network '{name}' is not configured (available: {available})")]
    UnknownNetwork { name: String, available: String },

    #[error("Circular task reference detected: {0}")]
    CircularDependency(String),

    #[error("Failed to include file '{path}': {error}")]
    IncludeFile { path: PathBuf, error: String },
}

/// Shell command execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command failed with exit code {0:?}")]
    CommandFailed(Option<i32>),

    #[error("Failed to spawn '{program}': {error}")]
    Spawn { program: String, error: String },
}

/// Variable interpolation errors
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Recursive interpolation detected")]
    RecursiveInterpolation,
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for interpolation operations
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;
