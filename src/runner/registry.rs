//! Task registry
//!
//! Holds every task definition keyed by name. Defining a name twice does not
//! replace the first definition, it appends an override to the chain.
//! The registry is only mutated while tasks are being registered, then
//! frozen and shared read-only with the runtime environment.

use crate::error::{BuidlError, DefinitionError, Result};
use crate::runner::chain::{action, Action, ResolvedTask, RunSuper, TaskValue};
use crate::runner::environment::RuntimeEnvironment;
use crate::runner::params::{ArgValue, ParamSchema, ParamSpec, ParamType, TaskArguments};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// One definition of a task
pub struct TaskDefinition {
    pub name: String,
    pub description: String,
    pub internal: bool,
    /// Parameters declared by this definition only
    pub params: Vec<ParamSpec>,
    action: Action,
}

impl TaskDefinition {
    pub fn action(&self) -> &Action {
        &self.action
    }
}

/// All definitions of one task name, oldest first
pub struct OverrideChain {
    name: String,
    definitions: Vec<TaskDefinition>,
    schema: ParamSchema,
}

impl OverrideChain {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description of the newest definition that has one
    pub fn description(&self) -> &str {
        self.definitions
            .iter()
            .rev()
            .map(|d| d.description.as_str())
            .find(|d| !d.is_empty())
            .unwrap_or("")
    }

    /// Visibility is decided by the first definition
    pub fn is_internal(&self) -> bool {
        self.definitions[0].internal
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn definitions(&self) -> &[TaskDefinition] {
        &self.definitions
    }

    /// Parameters of every definition in the chain
    pub fn schema(&self) -> &ParamSchema {
        &self.schema
    }

    /// Snapshot the chain into a callable
    pub fn resolve(&self) -> ResolvedTask {
        ResolvedTask::new(
            &self.name,
            self.definitions.iter().map(|d| d.action.clone()).collect(),
        )
    }
}

/// Registry of task override chains
#[derive(Default)]
pub struct TaskRegistry {
    chains: BTreeMap<String, OverrideChain>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a definition. Nothing is registered until
    /// [`TaskBuilder::set_action`] is called.
    pub fn define(&mut self, name: &str, description: &str, internal: bool) -> TaskBuilder<'_> {
        TaskBuilder {
            registry: self,
            name: name.to_string(),
            description: description.to_string(),
            internal,
            params: Vec::new(),
        }
    }

    /// Define a public task
    pub fn task(&mut self, name: &str, description: &str) -> TaskBuilder<'_> {
        self.define(name, description, false)
    }

    /// Define a task hidden from task listings
    pub fn internal_task(&mut self, name: &str, description: &str) -> TaskBuilder<'_> {
        self.define(name, description, true)
    }

    pub fn get(&self, name: &str) -> Result<&OverrideChain> {
        self.chains
            .get(name)
            .ok_or_else(|| BuidlError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.chains.contains_key(name)
    }

    /// Tasks meant to be shown to users, sorted by name
    pub fn public_tasks(&self) -> impl Iterator<Item = &OverrideChain> {
        self.chains.values().filter(|c| !c.is_internal())
    }

    /// End the registration phase
    pub fn freeze(self) -> Arc<TaskRegistry> {
        Arc::new(self)
    }

    fn append(&mut self, definition: TaskDefinition) -> std::result::Result<(), DefinitionError> {
        match self.chains.get_mut(&definition.name) {
            Some(chain) => {
                // Validate against a copy so a rejected override leaves the chain untouched
                let mut schema = chain.schema.clone();
                for spec in &definition.params {
                    if spec.is_positional() {
                        return Err(DefinitionError::PositionalOnOverride {
                            task: definition.name.clone(),
                            param: spec.name.clone(),
                        });
                    }
                    schema.push(&definition.name, spec.clone())?;
                }
                tracing::debug!(task = %definition.name, depth = chain.len() + 1, "overriding task");
                chain.schema = schema;
                chain.definitions.push(definition);
            }
            None => {
                let mut schema = ParamSchema::new();
                for spec in &definition.params {
                    schema.push(&definition.name, spec.clone())?;
                }
                tracing::trace!(task = %definition.name, "defining task");
                self.chains.insert(
                    definition.name.clone(),
                    OverrideChain {
                        name: definition.name.clone(),
                        definitions: vec![definition],
                        schema,
                    },
                );
            }
        }
        Ok(())
    }
}

/// Declares the parameters and the action of one definition
pub struct TaskBuilder<'a> {
    registry: &'a mut TaskRegistry,
    name: String,
    description: String,
    internal: bool,
    params: Vec<ParamSpec>,
}

impl<'a> TaskBuilder<'a> {
    pub fn add_positional_param(mut self, name: &str, description: &str, default: Option<ArgValue>) -> Self {
        self.params.push(ParamSpec::positional(name, description, default));
        self
    }

    pub fn add_positional_param_typed(
        mut self,
        name: &str,
        description: &str,
        default: Option<ArgValue>,
        param_type: ParamType,
    ) -> Self {
        self.params
            .push(ParamSpec::positional(name, description, default).with_type(param_type));
        self
    }

    pub fn add_flag(mut self, name: &str, description: &str) -> Self {
        self.params.push(ParamSpec::flag(name, description));
        self
    }

    pub fn add_optional_param(
        mut self,
        name: &str,
        description: &str,
        default: Option<ArgValue>,
        param_type: Option<ParamType>,
    ) -> Self {
        self.params.push(
            ParamSpec::optional(name, description, default).with_type(param_type.unwrap_or_default()),
        );
        self
    }

    /// Add an already built parameter declaration
    pub fn add_param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Attach the action and register the definition
    pub fn set_action<F, Fut>(self, f: F) -> Result<()>
    where
        F: Fn(TaskArguments, RuntimeEnvironment, RunSuper) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TaskValue>> + Send + 'static,
    {
        self.set_boxed_action(action(f))
    }

    pub fn set_boxed_action(self, action: Action) -> Result<()> {
        let definition = TaskDefinition {
            name: self.name,
            description: self.description,
            internal: self.internal,
            params: self.params,
            action,
        };
        self.registry.append(definition)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn noop(registry: &mut TaskRegistry, name: &str, internal: bool) {
        registry
            .define(name, "", internal)
            .set_action(|_, _, _| async { Ok(Value::Null) })
            .unwrap();
    }

    #[test]
    fn test_get_unknown_task() {
        let registry = TaskRegistry::new();
        let result = registry.get("nope");
        assert!(matches!(result, Err(BuidlError::UnknownTask(name)) if name == "nope"));
    }

    #[test]
    fn test_define_twice_appends() {
        let mut registry = TaskRegistry::new();
        noop(&mut registry, "compile", false);
        noop(&mut registry, "compile", false);
        noop(&mut registry, "compile", false);

        let chain = registry.get("compile").unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.resolve().depth(), 3);
    }

    #[test]
    fn test_internal_tasks_hidden_from_listing() {
        let mut registry = TaskRegistry::new();
        noop(&mut registry, "run", false);
        noop(&mut registry, "builtin:setup-run-environment", true);

        let public: Vec<&str> = registry.public_tasks().map(|c| c.name()).collect();
        assert_eq!(public, vec!["run"]);
        assert!(registry.get("builtin:setup-run-environment").is_ok());
    }

    #[test]
    fn test_override_inherits_params_and_may_add_flags() {
        let mut registry = TaskRegistry::new();
        registry
            .task("run", "Runs a script")
            .add_positional_param("script", "Script", None)
            .set_action(|_, _, _| async { Ok(Value::Null) })
            .unwrap();
        registry
            .task("run", "")
            .add_flag("dryRun", "Only print")
            .set_action(|_, _, _| async { Ok(Value::Null) })
            .unwrap();

        let chain = registry.get("run").unwrap();
        assert_eq!(chain.schema().len(), 2);
        assert_eq!(chain.description(), "Runs a script");
    }

    #[test]
    fn test_override_cannot_add_positional() {
        let mut registry = TaskRegistry::new();
        noop(&mut registry, "run", false);

        let result = registry
            .task("run", "")
            .add_positional_param("extra", "", None)
            .set_action(|_, _, _| async { Ok(Value::Null) });

        assert!(matches!(
            result,
            Err(BuidlError::Definition(DefinitionError::PositionalOnOverride { .. }))
        ));
        assert_eq!(registry.get("run").unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_param_rejected() {
        let mut registry = TaskRegistry::new();
        let result = registry
            .task("t", "")
            .add_positional_param("x", "", None)
            .add_flag("x", "")
            .set_action(|_, _, _| async { Ok(Value::Null) });
        assert!(matches!(result, Err(BuidlError::Definition(_))));
        assert!(!registry.contains("t"));
    }
}
