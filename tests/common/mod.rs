//! Common test utilities

#![allow(dead_code)]

use buidl::builtin::{register_builtins, Collaborators};
use buidl::config::BuidlConfig;
use buidl::runner::{RuntimeEnvironment, TaskRegistry};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory with a buidl.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("buidl.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Create a test config with a subdirectory to start searching from
pub fn create_test_config_in_subdir(content: &str) -> (TempDir, PathBuf, PathBuf) {
    let (temp_dir, config_path) = create_test_config(content);
    let sub_dir = temp_dir.path().join("scripts").join("deploy");
    fs::create_dir_all(&sub_dir).unwrap();
    (temp_dir, config_path, sub_dir)
}

/// Default configuration for a project in a fresh temporary directory
pub fn test_project() -> (TempDir, BuidlConfig) {
    let temp_dir = TempDir::new().unwrap();
    let config = BuidlConfig::with_root(temp_dir.path().to_path_buf());
    (temp_dir, config)
}

/// Build an environment with the built-in tasks backed by the given collaborators
pub fn builtin_env(config: BuidlConfig, collaborators: Collaborators) -> RuntimeEnvironment {
    let mut registry = TaskRegistry::new();
    register_builtins(&mut registry, collaborators).unwrap();
    RuntimeEnvironment::builder(config, registry).build()
}
