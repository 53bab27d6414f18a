//! Integration tests for publishing the environment to the global scope
//!
//! Everything touching the process-wide scope lives in one test so nothing
//! else in this binary can inject concurrently.

mod common;

use buidl::builtin::{Collaborators, FnScriptHost, SolcCompiler, TASK_RUN, TASK_SETUP_RUN_ENVIRONMENT};
use buidl::error::BuidlError;
use buidl::runner::{global, global_scope, ArgValue, GlobalScope, RuntimeEnvironment, TaskArguments, TaskRegistry};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_scripts_see_the_injected_environment() {
    // Nothing is published before the setup hook runs
    assert!(matches!(global::ambient_env(), Err(BuidlError::EnvironmentNotInjected)));

    let (temp_dir, config) = common::test_project();
    let collaborators = Collaborators {
        compiler: Arc::new(SolcCompiler::default()),
        script_host: Arc::new(FnScriptHost::new(|_path, env: RuntimeEnvironment| async move {
            let ambient = global::ambient_env()?;
            anyhow::ensure!(ambient.ptr_eq(&env), "ambient environment differs");

            // Scripts run tasks through the ambient scope
            let greeting = global::run("greet", TaskArguments::new()).await?;
            anyhow::ensure!(greeting == json!("hi"), "unexpected greeting {}", greeting);
            Ok(())
        })),
    };

    let mut registry = TaskRegistry::new();
    buidl::builtin::register_builtins(&mut registry, collaborators).unwrap();
    registry
        .task("greet", "")
        .set_action(|_, _, _| async { Ok(json!("hi")) })
        .unwrap();
    let env = RuntimeEnvironment::builder(config, registry).build();

    // Building the environment publishes nothing either
    assert!(!global_scope().is_injected());
    assert!(matches!(global::ambient_env(), Err(BuidlError::EnvironmentNotInjected)));

    let script = temp_dir.path().join("deploy.js");
    std::fs::write(&script, "").unwrap();

    let mut args = TaskArguments::new();
    args.insert("script".to_string(), ArgValue::from(script.display().to_string()));
    args.insert("noCompile".to_string(), ArgValue::Bool(true));
    env.run(TASK_RUN, args).await.unwrap();

    assert!(global_scope().env().unwrap().ptr_eq(&env));
    let members = global_scope().members();

    // Running the hook again changes nothing
    env.run_task(TASK_SETUP_RUN_ENVIRONMENT).await.unwrap();
    assert_eq!(global_scope().members(), members);
    assert!(global_scope().env().unwrap().ptr_eq(&env));
    assert_eq!(global_scope().arguments().unwrap(), *env.arguments());
}

#[test]
fn test_environments_can_be_built_without_a_global_scope() {
    let (_temp_dir, config) = common::test_project();
    let env = RuntimeEnvironment::builder(config, TaskRegistry::new()).build();

    let scope = GlobalScope::new();
    env.inject_into(&scope);
    env.inject_into(&scope);
    assert_eq!(scope.members(), vec!["env", "config", "arguments", "run", "artifacts"]);
}
