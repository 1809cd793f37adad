use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::types::RunCommand;

#[derive(Parser, Debug)]
#[command(
    name = "snapborg",
    version,
    about = "Archive the latest snapper snapshots into borg repositories"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[arg(long, global = true)]
    pub dry_run: bool,
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Run only the named repository (repeatable)
    #[arg(long = "repo", global = true)]
    pub repos: Vec<String>,
    /// Lock file path (defaults to the executable)
    #[arg(long, global = true)]
    pub lock_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Archive the latest snapshot of every repository
    Backup,
    /// Apply the retention policy
    Prune,
    /// Create missing repositories
    Init,
    /// Show archives per repository
    List,
}

impl From<Command> for RunCommand {
    fn from(command: Command) -> Self {
        match command {
            Command::Backup => RunCommand::Backup,
            Command::Prune => RunCommand::Prune,
            Command::Init => RunCommand::Init,
            Command::List => RunCommand::List,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_leaves_command_unset() {
        let cli = Cli::try_parse_from(["snapborg"]).expect("parse");
        assert!(cli.command.is_none());
        assert!(!cli.dry_run);
        assert!(cli.repos.is_empty());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "snapborg", "prune", "--repo", "root", "--repo", "home", "--dry-run", "-v",
            "--config", "/tmp/s.yaml",
        ])
        .expect("parse");
        assert_eq!(cli.command, Some(Command::Prune));
        assert_eq!(cli.repos, vec!["root", "home"]);
        assert!(cli.dry_run && cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.yaml")));
        assert_eq!(RunCommand::from(Command::Prune), RunCommand::Prune);
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["snapborg", "restore"]).is_err());
    }
}
