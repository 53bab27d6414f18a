//! Integration tests for task overriding and invocation

mod common;

use buidl::error::{BuidlError, ParamError};
use buidl::runner::{ArgValue, ParamType, RuntimeEnvironment, TaskArguments, TaskRegistry};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn build(registry: TaskRegistry) -> (tempfile::TempDir, RuntimeEnvironment) {
    let (temp_dir, config) = common::test_project();
    (temp_dir, RuntimeEnvironment::builder(config, registry).build())
}

#[tokio::test]
async fn test_override_extends_previous_result() {
    let mut registry = TaskRegistry::new();
    registry
        .task("greet", "Says hi")
        .set_action(|_, _, _| async { Ok(json!("hi")) })
        .unwrap();
    registry
        .task("greet", "")
        .set_action(|_, _, run_super| async move {
            let previous = run_super.call().await?;
            Ok(json!(format!("{}!", previous.as_str().unwrap_or_default())))
        })
        .unwrap();

    let (_dir, env) = build(registry);
    assert_eq!(env.run_task("greet").await.unwrap(), json!("hi!"));
}

#[tokio::test]
async fn test_chain_runs_newest_first_down_to_the_first_definition() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = TaskRegistry::new();

    for layer in 1..=4 {
        let log = log.clone();
        registry
            .task("deploy", "")
            .set_action(move |_, _, run_super| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(layer);
                    if run_super.is_defined() {
                        run_super.call().await
                    } else {
                        Ok(json!(layer))
                    }
                }
            })
            .unwrap();
    }

    let (_dir, env) = build(registry);
    assert_eq!(env.run_task("deploy").await.unwrap(), json!(1));
    assert_eq!(*log.lock().unwrap(), vec![4, 3, 2, 1]);
}

#[tokio::test]
async fn test_super_from_first_definition_fails() {
    let mut registry = TaskRegistry::new();
    registry
        .task("deploy", "")
        .set_action(|_, _, run_super| async move { run_super.call().await })
        .unwrap();

    let (_dir, env) = build(registry);
    let result = env.run_task("deploy").await;
    assert!(matches!(result, Err(BuidlError::NoSuperTask(name)) if name == "deploy"));
}

#[tokio::test]
async fn test_super_can_be_called_many_times() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = TaskRegistry::new();

    let counter = calls.clone();
    registry
        .task("count", "")
        .set_action(move |_, _, _| {
            let counter = counter.clone();
            async move { Ok(json!(counter.fetch_add(1, Ordering::SeqCst) + 1)) }
        })
        .unwrap();
    registry
        .task("count", "")
        .set_action(|_, _, run_super| async move {
            let first = run_super.call().await?;
            let second = run_super.call().await?;
            Ok(json!([first, second]))
        })
        .unwrap();

    let (_dir, env) = build(registry);
    assert_eq!(env.run_task("count").await.unwrap(), json!([1, 2]));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_super_with_replaced_arguments() {
    let mut registry = TaskRegistry::new();
    registry
        .task("greet", "")
        .add_optional_param("who", "Who to greet", Some("world".into()), None)
        .set_action(|args, _, _| async move {
            Ok(json!(format!("hello {}", args["who"])))
        })
        .unwrap();
    registry
        .task("greet", "")
        .set_action(|args, _, run_super| async move {
            let mut replaced = args.clone();
            replaced.insert("who".to_string(), ArgValue::from("override"));
            let theirs = run_super.call_with(replaced).await?;
            let ours = run_super.call().await?;
            Ok(json!([theirs, ours]))
        })
        .unwrap();

    let (_dir, env) = build(registry);
    assert_eq!(
        env.run_task("greet").await.unwrap(),
        json!(["hello override", "hello world"])
    );
}

#[tokio::test]
async fn test_task_can_run_itself_through_the_environment() {
    let mut registry = TaskRegistry::new();
    registry
        .task("countdown", "")
        .add_optional_param("n", "Start", Some(ArgValue::from(3_i64)), Some(ParamType::Integer))
        .set_action(|args, env, _| async move {
            let n = args["n"].as_i64().unwrap_or(0);
            if n == 0 {
                return Ok(json!(0));
            }
            let mut next = TaskArguments::new();
            next.insert("n".to_string(), ArgValue::from(n - 1));
            let rest = env.run("countdown", next).await?;
            Ok(json!(n + rest.as_i64().unwrap_or(0)))
        })
        .unwrap();

    let (_dir, env) = build(registry);
    assert_eq!(env.run_task("countdown").await.unwrap(), json!(6));
}

#[tokio::test]
async fn test_missing_task() {
    let (_dir, env) = build(TaskRegistry::new());
    let err = env.run_task("missing-task").await.unwrap_err();

    assert!(matches!(err, BuidlError::UnknownTask(_)));
    assert!(err.to_string().contains("missing-task"));
}

#[tokio::test]
async fn test_required_positional_is_checked_before_the_action() {
    let ran = Arc::new(AtomicUsize::new(0));
    let mut registry = TaskRegistry::new();

    let counter = ran.clone();
    registry
        .task("verify", "")
        .add_positional_param("contract", "Contract to verify", None)
        .add_flag("force", "Verify again")
        .set_action(move |args, _, _| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!(args["force"].as_bool()))
            }
        })
        .unwrap();

    let (_dir, env) = build(registry);
    let result = env.run_task("verify").await;
    assert!(matches!(
        result,
        Err(BuidlError::Param(ParamError::MissingRequiredParam { .. }))
    ));
    assert_eq!(ran.load(Ordering::SeqCst), 0);

    let mut args = TaskArguments::new();
    args.insert("contract".to_string(), ArgValue::from("Token"));
    assert_eq!(env.run("verify", args.clone()).await.unwrap(), json!(false));

    args.insert("force".to_string(), ArgValue::Bool(true));
    assert_eq!(env.run("verify", args).await.unwrap(), json!(true));
}

#[tokio::test]
async fn test_untyped_action_error_names_the_task() {
    let mut registry = TaskRegistry::new();
    registry
        .task("flaky", "")
        .set_action(|_, _, _| async {
            Err::<Value, _>(anyhow::anyhow!("connection refused").into())
        })
        .unwrap();

    let (_dir, env) = build(registry);
    let err = env.run_task("flaky").await.unwrap_err();
    match err {
        BuidlError::TaskFailed { task, error } => {
            assert_eq!(task, "flaky");
            assert!(error.to_string().contains("connection refused"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
