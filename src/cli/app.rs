//! Main CLI application

use crate::builtin::{register_builtins, Collaborators, TASK_HELP};
use crate::cli::logging::{init_tracing, Verbosity};
use crate::config::{
    check_network_selected, load_config_auto, load_config_file, validate_config, BuidlConfig,
};
use crate::error::BuidlError;
use crate::runner::{
    register_config_tasks, ArgValue, GlobalArguments, OverrideChain, ParamKind, RuntimeEnvironment,
    TaskArguments, TaskRegistry, DEFAULT_NETWORK,
};
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use std::error::Error as _;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// CLI application
pub struct App {
    /// Parsed configuration
    config: BuidlConfig,
    /// Every registered task, built-ins first
    registry: TaskRegistry,
}

impl App {
    /// Load the project configuration and register every task
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, BuidlError> {
        let config = match config_path {
            Some(path) => load_config_file(&path)?,
            None => load_config_auto()?,
        };
        let collaborators = Collaborators::for_config(&config);
        Self::with_collaborators(config, collaborators)
    }

    /// Register every task of a loaded configuration around the given collaborators
    pub fn with_collaborators(
        config: BuidlConfig,
        collaborators: Collaborators,
    ) -> Result<Self, BuidlError> {
        validate_config(&config)?;
        load_dotenv(&config.paths.root);

        let mut registry = TaskRegistry::new();
        register_builtins(&mut registry, collaborators)?;
        register_config_tasks(&mut registry, &config)?;

        Ok(App { config, registry })
    }

    /// Parse the command line and run the requested task
    pub async fn run(self, args: Vec<String>) -> Result<(), BuidlError> {
        let mut command = build_command(&self.registry);
        let matches = match command.try_get_matches_from_mut(&args) {
            Ok(matches) => matches,
            Err(e) => match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    print!("{}", e);
                    return Ok(());
                }
                _ => return Err(BuidlError::Usage(e.render().to_string())),
            },
        };

        init_tracing(get_verbosity(&matches));
        let arguments = global_arguments(&matches);
        check_network_selected(&self.config, &arguments.network)?;

        let (task_name, task_args) = match matches.subcommand() {
            Some((name, sub_matches)) => {
                let args = match self.registry.get(name) {
                    Ok(chain) if !chain.is_internal() => parse_task_args(chain, sub_matches),
                    // Internal tasks have no subcommand, their values arrive raw
                    Ok(chain) => chain.schema().bind_positional(name, &external_values(sub_matches))?,
                    Err(_) => TaskArguments::new(),
                };
                (name.to_string(), args)
            }
            None => (TASK_HELP.to_string(), TaskArguments::new()),
        };

        tracing::debug!(task = %task_name, network = %arguments.network, "starting");

        let env = RuntimeEnvironment::builder(self.config, self.registry)
            .with_arguments(arguments)
            .build();
        env.run(&task_name, task_args).await?;

        Ok(())
    }
}

/// Build the clap command from the registered tasks
pub fn build_command(registry: &TaskRegistry) -> Command {
    let mut cmd = Command::new("buidl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A task-based build and automation tool for smart-contract projects")
        .allow_external_subcommands(true)
        .disable_help_subcommand(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Path to a buidl.yml config file")
                .global(true),
        )
        .arg(
            Arg::new("network")
                .long("network")
                .value_name("NAME")
                .help("The network to connect to")
                .default_value(DEFAULT_NETWORK)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("show-stack-traces")
                .long("show-stack-traces")
                .help("Show the full cause chain of errors")
                .action(ArgAction::SetTrue)
                .global(true),
        );

    for chain in registry.public_tasks() {
        cmd = cmd.subcommand(task_command(chain));
    }

    cmd
}

fn task_command(chain: &OverrideChain) -> Command {
    let mut task_cmd = Command::new(chain.name().to_string()).about(chain.description().to_string());

    // Presence is checked by the engine, so every argument is optional here
    for spec in chain.schema().iter() {
        let mut arg = Arg::new(spec.name.clone()).help(spec.description.clone());

        arg = match &spec.kind {
            ParamKind::Positional { .. } => arg.value_name(spec.name.to_uppercase()),
            ParamKind::Flag => arg.long(spec.cli_name()).action(ArgAction::SetTrue),
            ParamKind::Optional { .. } => arg
                .long(spec.cli_name())
                .value_name(spec.name.to_uppercase()),
        };

        task_cmd = task_cmd.arg(arg);
    }

    task_cmd
}

/// Collect the values given for a task's parameters. Absent values are left
/// out so defaults apply during validation.
fn parse_task_args(chain: &OverrideChain, matches: &ArgMatches) -> TaskArguments {
    let mut args = TaskArguments::new();

    for spec in chain.schema().iter() {
        if spec.is_flag() {
            if matches.get_flag(&spec.name) {
                args.insert(spec.name.clone(), ArgValue::Bool(true));
            }
        } else if let Some(value) = matches.get_one::<String>(&spec.name) {
            args.insert(spec.name.clone(), ArgValue::String(value.clone()));
        }
    }

    args
}

fn external_values(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<OsString>("")
        .map(|values| values.map(|v| v.to_string_lossy().into_owned()).collect())
        .unwrap_or_default()
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

fn global_arguments(matches: &ArgMatches) -> GlobalArguments {
    GlobalArguments {
        network: matches
            .get_one::<String>("network")
            .cloned()
            .unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
        verbose: matches.get_flag("verbose"),
        show_stack_traces: matches.get_flag("show-stack-traces"),
        config: matches.get_one::<String>("config").map(PathBuf::from),
    }
}

fn load_dotenv(root: &Path) {
    let path = root.join(".env");
    if path.is_file() {
        if let Err(e) = dotenvy::from_path(&path) {
            eprintln!("{} couldn't load {}: {}", "Warning:".yellow(), path.display(), e);
        }
    }
}

/// Run the CLI application with the process arguments
pub async fn run() -> Result<(), BuidlError> {
    let args: Vec<String> = std::env::args().collect();
    let config_path = extract_config_arg(&args);

    App::new(config_path)?.run(args).await
}

/// Extract --config argument before clap parsing
pub fn extract_config_arg(args: &[String]) -> Option<PathBuf> {
    for i in 0..args.len() {
        if let Some(path) = args[i].strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
        if args[i] == "--config" && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
    }
    None
}

/// Whether the full cause chain was asked for
pub fn wants_stack_traces(args: &[String]) -> bool {
    args.iter().any(|a| a == "--show-stack-traces")
}

/// Print an error for the user. The cause chain is shown for internal
/// errors, or when asked for.
pub fn report_error(error: &BuidlError, show_stack_traces: bool) {
    if let BuidlError::Usage(message) = error {
        eprint!("{}", message);
        return;
    }

    eprintln!("{} {}", "Error:".red().bold(), error);

    if show_stack_traces || error.is_internal() {
        let mut source = error.source();
        while let Some(cause) = source {
            eprintln!("  {} {}", "caused by:".dimmed(), cause);
            source = cause.source();
        }
    } else {
        eprintln!("\nFor more info run buidl with --show-stack-traces");
    }
}
