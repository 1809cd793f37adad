pub mod backup;
pub mod init;
pub mod list;
pub mod prune;

use tracing::warn;

use crate::archive::Repository;
use crate::config::RuntimeConfig;
use crate::error::{Result, SnapborgError};
use crate::instance::Instance;
use crate::snapshot::snapper::SnapperDbus;
use crate::snapshot::SnapshotBackend;
use crate::types::RunMode;

pub struct CommandContext {
    pub config: RuntimeConfig,
    pub selected: Vec<String>,
    pub run_mode: RunMode,
    pub instance: Instance,
}

impl CommandContext {
    pub fn repositories(&self) -> Result<Vec<Repository>> {
        self.config.resolve_repositories(
            || SnapperDbus::connect()?.list_configs(),
            &self.selected,
        )
    }
}

pub fn for_each_repository<F>(repos: &[Repository], what: &str, mut step: F) -> Result<()>
where
    F: FnMut(&Repository) -> Result<()>,
{
    let mut first: Option<SnapborgError> = None;
    let mut failed = 0usize;
    for repo in repos {
        if let Err(err) = step(repo) {
            println!("{} of {} failed: {}", what, repo.name(), err);
            failed += 1;
            if first.is_none() {
                first = Some(err);
            } else {
                warn!(repository = %repo.name(), error = %err, "additional failure");
            }
        }
    }
    match first {
        Some(err) => {
            if failed > 1 {
                println!("{} failed for {} of {} repositories", what, failed, repos.len());
            }
            Err(err)
        }
        None => Ok(()),
    }
}

pub fn exit_for_error(err: &SnapborgError) -> ! {
    eprintln!("snapborg: {}", err);
    std::process::exit(err.exit_code());
}
