#[derive(Debug, Clone, Copy, Default)]
pub struct RunMode {
    pub dry_run: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunCommand {
    Backup,
    Prune,
    Init,
    List,
}

impl RunCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunCommand::Backup => "backup",
            RunCommand::Prune => "prune",
            RunCommand::Init => "init",
            RunCommand::List => "list",
        }
    }
}
