//! Ambient access to the runtime environment
//!
//! User scripts run by the `run` task don't receive the environment as an
//! argument. Instead the `builtin:setup-run-environment` hook publishes it
//! here and scripts reach it through [`ambient_env`] and [`run`].
//! Nothing is published unless that hook (or some other explicit caller)
//! asks for it.

use crate::config::BuidlConfig;
use crate::error::{BuidlError, Result};
use crate::runner::chain::TaskValue;
use crate::runner::environment::{Artifacts, GlobalArguments, RuntimeEnvironment};
use crate::runner::params::TaskArguments;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// Members published by an injection
pub const INJECTED_MEMBERS: [&str; 5] = ["env", "config", "arguments", "run", "artifacts"];

static GLOBAL_SCOPE: Lazy<GlobalScope> = Lazy::new(GlobalScope::new);

/// A slot the runtime environment can be published into
#[derive(Default)]
pub struct GlobalScope {
    env: RwLock<Option<RuntimeEnvironment>>,
}

impl GlobalScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an environment. Publishing the same one again is a no-op.
    pub fn inject(&self, env: &RuntimeEnvironment) {
        let mut slot = self.env.write();
        match slot.as_ref() {
            Some(current) if current.ptr_eq(env) => {}
            Some(_) => {
                tracing::warn!("replacing the runtime environment in the global scope");
                *slot = Some(env.clone());
            }
            None => {
                tracing::debug!("injecting runtime environment into the global scope");
                *slot = Some(env.clone());
            }
        }
    }

    pub fn is_injected(&self) -> bool {
        self.env.read().is_some()
    }

    /// Names currently bound in this scope
    pub fn members(&self) -> Vec<&'static str> {
        if self.is_injected() {
            INJECTED_MEMBERS.to_vec()
        } else {
            Vec::new()
        }
    }

    pub fn env(&self) -> Result<RuntimeEnvironment> {
        self.env
            .read()
            .clone()
            .ok_or(BuidlError::EnvironmentNotInjected)
    }

    pub fn config(&self) -> Result<BuidlConfig> {
        Ok(self.env()?.config().clone())
    }

    pub fn arguments(&self) -> Result<GlobalArguments> {
        Ok(self.env()?.arguments().clone())
    }

    pub fn artifacts(&self) -> Result<Artifacts> {
        Ok(self.env()?.artifacts().clone())
    }

    /// Remove whatever was published
    pub fn clear(&self) {
        self.env.write().take();
    }
}

/// The process-wide scope
pub fn global_scope() -> &'static GlobalScope {
    &GLOBAL_SCOPE
}

/// The environment published to the process-wide scope
pub fn ambient_env() -> Result<RuntimeEnvironment> {
    global_scope().env()
}

/// Run a task through the ambient environment
pub async fn run(name: &str, args: TaskArguments) -> Result<TaskValue> {
    let env = ambient_env()?;
    env.run(name, args).await
}
