//! Configuration file discovery, parsing and resolution

use crate::config::types::{
    AutoNetworkConfig, BuidlConfig, HttpNetworkConfig, NetworkConfig, NetworkKind, ProjectPaths,
    SolcConfig, TaskConfig, UserConfig, DEFAULT_SOLC_VERSION,
};
use crate::error::{BuidlError, ConfigError, ConfigResult};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["buidl.yml", "buidl.yaml"];

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

impl BuidlConfig {
    /// Default configuration for a project rooted at `root`
    pub fn with_root(root: PathBuf) -> Self {
        BuidlConfig {
            paths: ProjectPaths {
                config_file: root.join(CONFIG_FILE_NAMES[0]),
                sources: root.join("contracts"),
                cache: root.join("cache"),
                artifacts: root.join("artifacts"),
                root,
            },
            solc: SolcConfig {
                version: DEFAULT_SOLC_VERSION.to_string(),
                optimizer: Default::default(),
            },
            networks: default_networks(),
            interpreter: None,
            tasks: Default::default(),
        }
    }
}

fn default_networks() -> BTreeMap<String, NetworkConfig> {
    let mut networks = BTreeMap::new();
    networks.insert(
        "develop".to_string(),
        NetworkConfig {
            kind: NetworkKind::Http(HttpNetworkConfig {
                host: "127.0.0.1".to_string(),
                port: Some(8545),
            }),
            from: None,
            gas: None,
            gas_price: None,
        },
    );
    networks.insert(
        "auto".to_string(),
        NetworkConfig {
            kind: NetworkKind::Auto(AutoNetworkConfig {
                accounts: Vec::new(),
                block_gas_limit: crate::config::types::default_block_gas_limit(),
                ganache_options: None,
            }),
            from: None,
            gas: None,
            gas_price: None,
        },
    );
    networks
}

/// Lay a user config over the defaults for the project containing `config_file`
pub fn resolve_config(user: UserConfig, config_file: &Path) -> BuidlConfig {
    let root = config_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut config = BuidlConfig::with_root(root.clone());
    config.paths.config_file = config_file.to_path_buf();

    if let Some(sources) = user.paths.sources {
        config.paths.sources = root.join(sources);
    }
    if let Some(cache) = user.paths.cache {
        config.paths.cache = root.join(cache);
    }
    if let Some(artifacts) = user.paths.artifacts {
        config.paths.artifacts = root.join(artifacts);
    }

    if let Some(version) = user.solc.version {
        config.solc.version = version;
    }
    if let Some(optimizer) = user.solc.optimizer {
        config.solc.optimizer = optimizer;
    }

    config.networks.extend(user.networks);
    config.interpreter = user.interpreter;
    config.tasks = user.tasks;
    config
}

/// Parse a user configuration from a string
pub fn parse_config(yaml: &str, config_path: Option<&Path>) -> Result<UserConfig, BuidlError> {
    // An empty file is a valid, all-defaults config
    let mut config: UserConfig = if yaml.trim().is_empty() {
        UserConfig::default()
    } else {
        serde_yaml::from_str(yaml)?
    };

    if let Some(base_path) = config_path {
        process_includes(&mut config, base_path)?;
    }

    Ok(config)
}

/// Parse and resolve a configuration file
pub fn load_config_file(path: &Path) -> Result<BuidlConfig, BuidlError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e))
    })?;

    // Relative paths in the config are resolved against its directory
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };

    let user = parse_config(&contents, Some(&path))?;
    Ok(resolve_config(user, &path))
}

/// Find, parse and resolve the configuration of the current project
pub fn load_config_auto() -> Result<BuidlConfig, BuidlError> {
    let config_path = find_config_file()?;
    load_config_file(&config_path)
}

/// Replace tasks carrying an `include` with the contents of that file
fn process_includes(config: &mut UserConfig, config_path: &Path) -> Result<(), BuidlError> {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    for task in config.tasks.values_mut() {
        if let Some(include_path) = &task.include {
            *task = load_included_task(&base_dir.join(include_path))?;
        }
    }

    Ok(())
}

fn load_included_task(path: &Path) -> Result<TaskConfig, BuidlError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::IncludeFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let task: TaskConfig = serde_yaml::from_str(&contents).map_err(|e| ConfigError::IncludeFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    if task.include.is_some() {
        return Err(ConfigError::IncludeFile {
            path: path.to_path_buf(),
            error: "included tasks can't include other files".to_string(),
        }
        .into());
    }

    Ok(task)
}
