//! Override chain resolution
//!
//! Every definition of a task name is kept, oldest first. When the task is
//! invoked the chain is resolved: the newest action runs, and each action
//! receives a [`RunSuper`] bound to its own position that runs the action
//! just below it. Nothing is wired at registration time.

use crate::error::{BuidlError, Result};
use crate::runner::environment::RuntimeEnvironment;
use crate::runner::params::TaskArguments;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;

/// Value produced by a task
pub type TaskValue = serde_json::Value;

/// Future returned by an action
pub type ActionFuture = BoxFuture<'static, Result<TaskValue>>;

/// The body of a task definition
pub type Action =
    Arc<dyn Fn(TaskArguments, RuntimeEnvironment, RunSuper) -> ActionFuture + Send + Sync>;

/// Box an async closure into an [`Action`]
pub fn action<F, Fut>(f: F) -> Action
where
    F: Fn(TaskArguments, RuntimeEnvironment, RunSuper) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskValue>> + Send + 'static,
{
    Arc::new(move |args, env, run_super| f(args, env, run_super).boxed())
}

/// A chain whose layers are ready to be called
#[derive(Clone)]
pub struct ResolvedTask {
    name: Arc<str>,
    layers: Arc<[Action]>,
}

impl ResolvedTask {
    pub(crate) fn new(name: &str, layers: Vec<Action>) -> Self {
        debug_assert!(!layers.is_empty());
        ResolvedTask {
            name: Arc::from(name),
            layers: Arc::from(layers),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Run the effective (newest) action
    pub fn invoke(&self, args: TaskArguments, env: RuntimeEnvironment) -> ActionFuture {
        self.invoke_layer(self.layers.len() - 1, args, env)
    }

    fn invoke_layer(&self, position: usize, args: TaskArguments, env: RuntimeEnvironment) -> ActionFuture {
        let run_super = RunSuper {
            task: self.clone(),
            position,
            args: args.clone(),
            env: env.clone(),
        };
        tracing::trace!(task = %self.name, layer = position, "invoking layer");
        (self.layers[position])(args, env, run_super)
    }
}

/// Runs the previous definition of the current task.
///
/// Handed to every action. Calling it from the first definition fails with
/// [`BuidlError::NoSuperTask`]. It may be called any number of times.
#[derive(Clone)]
pub struct RunSuper {
    task: ResolvedTask,
    position: usize,
    args: TaskArguments,
    env: RuntimeEnvironment,
}

impl RunSuper {
    /// Whether there is a previous definition to delegate to
    pub fn is_defined(&self) -> bool {
        self.position > 0
    }

    /// Run the previous definition with the arguments of the current call
    pub async fn call(&self) -> Result<TaskValue> {
        self.call_with(self.args.clone()).await
    }

    /// Run the previous definition with a replacement set of arguments
    pub async fn call_with(&self, args: TaskArguments) -> Result<TaskValue> {
        if !self.is_defined() {
            return Err(BuidlError::NoSuperTask(self.task.name().to_string()));
        }
        tracing::debug!(task = %self.task.name(), layer = self.position - 1, "running super");
        self.task
            .invoke_layer(self.position - 1, args, self.env.clone())
            .await
    }
}
