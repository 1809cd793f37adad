use std::env;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::cli::args::Cli;
use crate::cli::commands::{backup, exit_for_error, init, list, prune, CommandContext};
use crate::config::load_config;
use crate::error::{SnapborgError, EXIT_USAGE};
use crate::instance::Instance;
use crate::types::{RunCommand, RunMode};

const CONFIG_FILE: &str = "/etc/snapborg.yaml";
const SYSTEMD_INSTANCE_VAR: &str = "SYSTEMD_INSTANCE";
const CLEANUP_INSTANCE: &str = "snapper-cleanup";

pub mod args;
pub mod commands;

pub fn run() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_tracing(cli.verbose);

    let command = cli
        .command
        .map(RunCommand::from)
        .unwrap_or_else(|| default_command(env::var(SYSTEMD_INSTANCE_VAR).ok().as_deref()));
    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let run_mode = RunMode {
        dry_run: cli.dry_run,
        verbose: cli.verbose,
    };

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(err) => exit_for_error(&err),
    };
    if run_mode.verbose {
        println!(
            "loaded config {} ({} configured repositories)",
            config_path.display(),
            config.repositories.len()
        );
    }

    let lock_path = match cli.lock_file.or_else(|| config.lock_file.clone()) {
        Some(path) => path,
        None => match env::current_exe() {
            Ok(path) => path,
            Err(err) => exit_for_error(&SnapborgError::Io(err)),
        },
    };

    let ctx = CommandContext {
        config,
        selected: cli.repos,
        run_mode,
        instance: Instance::new(lock_path),
    };
    tracing::debug!(command = command.as_str(), dry_run = run_mode.dry_run, "starting");
    let result = match command {
        RunCommand::Backup => backup::run_backup(&ctx),
        RunCommand::Prune => prune::run_prune(&ctx),
        RunCommand::Init => init::run_init(&ctx),
        RunCommand::List => list::run_list(&ctx),
    };
    if let Err(err) = result {
        exit_for_error(&err);
    }
    Ok(())
}

pub fn default_command(systemd_instance: Option<&str>) -> RunCommand {
    match systemd_instance {
        Some(CLEANUP_INSTANCE) => RunCommand::Prune,
        _ => RunCommand::Backup,
    }
}

const LOCK_AUDIT_DIRECTIVE: &str = "snapborg::lock=info";

fn init_tracing(verbose: bool) {
    let filter = build_filter(verbose, env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// Lock lines stay on stderr whatever RUST_LOG says.
fn build_filter(verbose: bool, from_env: Option<&str>) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    let filter = from_env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default));
    match LOCK_AUDIT_DIRECTIVE.parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}
