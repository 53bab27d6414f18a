//! Configuration validation
//!
//! Checks the parts of a resolved configuration that serde can't: network
//! settings, the compiler version and references between config tasks.

use crate::config::types::{BuidlConfig, NetworkConfig, NetworkKind, Run};
use crate::error::{ConfigError, ConfigResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static SOLC_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+(?:[-+][0-9A-Za-z.+-]+)?$").expect("valid version regex")
});

/// Validate a complete configuration
pub fn validate_config(config: &BuidlConfig) -> ConfigResult<()> {
    if !SOLC_VERSION.is_match(&config.solc.version) {
        return Err(ConfigError::Invalid(format!(
            "Invalid solc version '{}', expected something like 0.4.24",
            config.solc.version
        )));
    }

    for (name, network) in &config.networks {
        validate_network(name, network)?;
    }

    if let Some(interpreter) = &config.interpreter {
        if interpreter.is_empty() {
            return Err(ConfigError::Invalid(
                "interpreter must name at least a program".to_string(),
            ));
        }
    }

    for (name, task) in &config.tasks {
        for run in &task.run {
            if let Run::Complex(item) = run {
                if item.command.is_empty() && item.task.is_empty() && !item.run_super {
                    return Err(ConfigError::Invalid(format!(
                        "Task '{}' has a run item with nothing to do",
                        name
                    )));
                }
            }
        }
    }

    detect_circular_task_references(config)?;

    Ok(())
}

/// Check that a network picked on the command line is configured
pub fn check_network_selected(config: &BuidlConfig, name: &str) -> ConfigResult<()> {
    if config.networks.contains_key(name) {
        return Ok(());
    }

    let available: Vec<&str> = config.networks.keys().map(String::as_str).collect();
    Err(ConfigError::UnknownNetwork {
        name: name.to_string(),
        available: available.join(", "),
    })
}

fn validate_network(name: &str, network: &NetworkConfig) -> ConfigResult<()> {
    let invalid = |reason: &str| ConfigError::InvalidNetwork {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    match &network.kind {
        NetworkKind::Http(http) => {
            if http.host.trim().is_empty() {
                return Err(invalid("host can't be empty"));
            }
            if http.port == Some(0) {
                return Err(invalid("port can't be 0"));
            }
        }
        NetworkKind::Auto(auto) => {
            if auto.block_gas_limit == 0 {
                return Err(invalid("block_gas_limit must be positive"));
            }
            if let Some(ganache) = &auto.ganache_options {
                if ganache.gas_limit == 0 {
                    return Err(invalid("ganache_options.gas_limit must be positive"));
                }
            }
        }
    }

    if network.gas == Some(0) {
        return Err(invalid("gas must be positive"));
    }

    Ok(())
}

/// Config tasks invoking each other in a loop would never terminate.
/// Only references between config tasks are followed; other names may be
/// defined in code.
fn detect_circular_task_references(config: &BuidlConfig) -> ConfigResult<()> {
    let mut visited = HashSet::new();
    let mut names: Vec<&String> = config.tasks.keys().collect();
    names.sort();

    for task_name in names {
        let mut stack = Vec::new();
        check_task_cycle(config, task_name, &mut visited, &mut stack)?;
    }
    Ok(())
}

fn check_task_cycle(
    config: &BuidlConfig,
    task_name: &str,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
) -> ConfigResult<()> {
    if stack.iter().any(|t| t == task_name) {
        stack.push(task_name.to_string());
        return Err(ConfigError::CircularDependency(stack.join(" -> ")));
    }

    if visited.contains(task_name) {
        return Ok(());
    }

    let task = match config.tasks.get(task_name) {
        Some(task) => task,
        None => return Ok(()),
    };

    stack.push(task_name.to_string());

    for run in &task.run {
        if let Run::Complex(item) = run {
            for subtask in &item.task {
                check_task_cycle(config, subtask.name(), visited, stack)?;
            }
        }
    }

    stack.pop();
    visited.insert(task_name.to_string());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse::{parse_config, resolve_config};
    use std::path::Path;

    fn resolved(yaml: &str) -> BuidlConfig {
        let user = parse_config(yaml, None).unwrap();
        resolve_config(user, Path::new("/project/buidl.yml"))
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&resolved("")).is_ok());
    }

    #[test]
    fn test_invalid_solc_version() {
        let config = resolved("solc:\n  version: latest\n");
        assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_network() {
        let config = resolved("networks:\n  broken:\n    host: localhost\n    port: 0\n");
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidNetwork { name, .. }) if name == "broken"
        ));
    }

    #[test]
    fn test_selected_network_must_be_configured() {
        let config = resolved("networks:\n  ropsten:\n    host: ropsten.example.org\n");
        assert!(check_network_selected(&config, "ropsten").is_ok());
        assert!(check_network_selected(&config, "auto").is_ok());

        match check_network_selected(&config, "nosuchnet") {
            Err(ConfigError::UnknownNetwork { name, available }) => {
                assert_eq!(name, "nosuchnet");
                assert_eq!(available, "auto, develop, ropsten");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_detect_circular_reference() {
        let config = resolved(
            r#"
tasks:
  a:
    run:
      - task: b
  b:
    run:
      - task: a
"#,
        );
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::CircularDependency(_))
        ));
    }

    #[test]
    fn test_reference_to_code_task_is_fine() {
        let config = resolved(
            r#"
tasks:
  build:
    run:
      - task: compile
      - echo done
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_run_item() {
        let config = resolved("tasks:\n  noop:\n    run:\n      - super: false\n");
        assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));
    }
}
