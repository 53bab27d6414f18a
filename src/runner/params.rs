//! Task parameters: declaration, validation and type coercion
//!
//! A task declares positional parameters, boolean flags and optional
//! named parameters. Every invocation goes through [`ParamSchema::validate`]
//! before the task's action runs, so actions always see a complete and
//! correctly typed argument map.

use crate::error::{DefinitionError, ParamError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Arguments of one task invocation, keyed by parameter name
pub type TaskArguments = BTreeMap<String, ArgValue>;

/// A single argument value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Integer(n) => Some(*n as f64),
            ArgValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(b) => write!(f, "{}", b),
            ArgValue::Integer(n) => write!(f, "{}", n),
            ArgValue::Number(n) => write!(f, "{}", n),
            ArgValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::String(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::String(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Number(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Integer(value)
    }
}

/// 2^53, the largest magnitude below which every integer is an exact f64
const MAX_EXACT_F64_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Type a parameter's value is coerced to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    #[serde(alias = "int")]
    Integer,
    Float,
    #[serde(alias = "bool")]
    Boolean,
}

impl ParamType {
    /// Coerce a value to this type. Strings coming from the command line are
    /// parsed, values that already have the right shape pass through.
    pub fn coerce(&self, value: &ArgValue) -> Option<ArgValue> {
        match (self, value) {
            (ParamType::String, ArgValue::String(_)) => Some(value.clone()),
            (ParamType::String, other) => Some(ArgValue::String(other.to_string())),
            (ParamType::Integer, ArgValue::Integer(_)) => Some(value.clone()),
            // Only whole numbers inside the range where f64 is exact
            (ParamType::Integer, ArgValue::Number(n))
                if n.fract() == 0.0 && n.abs() <= MAX_EXACT_F64_INTEGER =>
            {
                Some(ArgValue::Integer(*n as i64))
            }
            (ParamType::Integer, ArgValue::String(s)) => {
                s.trim().parse::<i64>().ok().map(ArgValue::Integer)
            }
            (ParamType::Float, ArgValue::Number(_)) => Some(value.clone()),
            (ParamType::Float, ArgValue::Integer(n)) => Some(ArgValue::Number(*n as f64)),
            (ParamType::Float, ArgValue::String(s)) => {
                s.trim().parse::<f64>().ok().filter(|n| n.is_finite()).map(ArgValue::Number)
            }
            (ParamType::Boolean, ArgValue::Bool(_)) => Some(value.clone()),
            (ParamType::Boolean, ArgValue::String(s)) => match s.trim() {
                "true" => Some(ArgValue::Bool(true)),
                "false" => Some(ArgValue::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Float => "float",
            ParamType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// How a parameter is supplied
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Matched by position on the command line
    Positional { default: Option<ArgValue> },
    /// Boolean, `true` when present
    Flag,
    /// Named, with an optional default
    Optional { default: Option<ArgValue> },
}

/// Declaration of one task parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub kind: ParamKind,
    pub param_type: ParamType,
}

impl ParamSpec {
    pub fn positional(name: &str, description: &str, default: Option<ArgValue>) -> Self {
        ParamSpec {
            name: name.to_string(),
            description: description.to_string(),
            kind: ParamKind::Positional { default },
            param_type: ParamType::String,
        }
    }

    pub fn flag(name: &str, description: &str) -> Self {
        ParamSpec {
            name: name.to_string(),
            description: description.to_string(),
            kind: ParamKind::Flag,
            param_type: ParamType::Boolean,
        }
    }

    pub fn optional(name: &str, description: &str, default: Option<ArgValue>) -> Self {
        ParamSpec {
            name: name.to_string(),
            description: description.to_string(),
            kind: ParamKind::Optional { default },
            param_type: ParamType::String,
        }
    }

    pub fn with_type(mut self, param_type: ParamType) -> Self {
        if self.kind != ParamKind::Flag {
            self.param_type = param_type;
        }
        self
    }

    pub fn is_positional(&self) -> bool {
        matches!(self.kind, ParamKind::Positional { .. })
    }

    pub fn is_flag(&self) -> bool {
        self.kind == ParamKind::Flag
    }

    pub fn default(&self) -> Option<&ArgValue> {
        match &self.kind {
            ParamKind::Positional { default } | ParamKind::Optional { default } => default.as_ref(),
            ParamKind::Flag => None,
        }
    }

    /// Name of the command-line option, `noCompile` becomes `no-compile`
    pub fn cli_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + 4);
        for c in self.name.chars() {
            if c.is_ascii_uppercase() {
                if !out.is_empty() {
                    out.push('-');
                }
                out.push(c.to_ascii_lowercase());
            } else if c == '_' {
                out.push('-');
            } else {
                out.push(c);
            }
        }
        out
    }
}

/// Command-line names taken by the global options
pub const RESERVED_PARAM_NAMES: &[&str] =
    &["config", "network", "quiet", "verbose", "show-stack-traces", "help"];

/// The full parameter list of a task, across all of its definitions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSchema {
    params: Vec<ParamSpec>,
}

impl ParamSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, enforcing the declaration rules
    pub fn push(&mut self, task: &str, spec: ParamSpec) -> Result<(), DefinitionError> {
        let cli_name = spec.cli_name();
        if RESERVED_PARAM_NAMES
            .iter()
            .any(|reserved| *reserved == spec.name || *reserved == cli_name)
        {
            return Err(DefinitionError::ReservedParam {
                task: task.to_string(),
                param: cli_name,
            });
        }

        if self.get(&spec.name).is_some() {
            return Err(DefinitionError::DuplicateParam {
                task: task.to_string(),
                param: spec.name,
            });
        }

        if let Some(default) = spec.default() {
            if spec.param_type.coerce(default).is_none() {
                return Err(DefinitionError::InvalidDefault {
                    task: task.to_string(),
                    param: spec.name,
                });
            }
        }

        if let ParamKind::Positional { default: None } = spec.kind {
            let follows_optional = self
                .positional()
                .any(|p| p.default().is_some());
            if follows_optional {
                return Err(DefinitionError::RequiredAfterOptional {
                    task: task.to_string(),
                    param: spec.name,
                });
            }
        }

        self.params.push(spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter()
    }

    /// Positional parameters in declaration order
    pub fn positional(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.is_positional())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Match raw positional values against the positional parameters in
    /// declaration order
    pub fn bind_positional(
        &self,
        task: &str,
        values: &[String],
    ) -> Result<TaskArguments, ParamError> {
        let mut args = TaskArguments::new();
        let mut specs = self.positional();

        for value in values {
            match specs.next() {
                Some(spec) => {
                    args.insert(spec.name.clone(), ArgValue::String(value.clone()));
                }
                None => {
                    return Err(ParamError::UnrecognizedParam {
                        task: task.to_string(),
                        param: value.clone(),
                    })
                }
            }
        }

        Ok(args)
    }

    /// Check the supplied arguments, coerce them and fill in defaults
    pub fn validate(&self, task: &str, supplied: TaskArguments) -> Result<TaskArguments, ParamError> {
        if let Some(unknown) = supplied.keys().find(|name| self.get(name).is_none()) {
            return Err(ParamError::UnrecognizedParam {
                task: task.to_string(),
                param: unknown.clone(),
            });
        }

        let mut resolved = TaskArguments::new();
        for spec in &self.params {
            let value = match supplied.get(&spec.name) {
                Some(raw) => Some(spec.param_type.coerce(raw).ok_or_else(|| {
                    ParamError::InvalidValue {
                        task: task.to_string(),
                        param: spec.name.clone(),
                        value: raw.to_string(),
                        expected: spec.param_type.to_string(),
                    }
                })?),
                None => match &spec.kind {
                    ParamKind::Flag => Some(ArgValue::Bool(false)),
                    ParamKind::Positional { default: None } => {
                        return Err(ParamError::MissingRequiredParam {
                            task: task.to_string(),
                            param: spec.name.clone(),
                        })
                    }
                    // Defaults were checked against the type when declared
                    ParamKind::Positional { default: Some(d) }
                    | ParamKind::Optional { default: Some(d) } => spec.param_type.coerce(d),
                    ParamKind::Optional { default: None } => None,
                },
            };

            if let Some(value) = value {
                resolved.insert(spec.name.clone(), value);
            }
        }

        Ok(resolved)
    }
}
