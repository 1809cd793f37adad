use chrono::Local;

use crate::cli::commands::{for_each_repository, CommandContext};
use crate::error::Result;
use crate::mount::BindMounter;
use crate::orchestrator::Orchestrator;
use crate::snapshot::snapper::SnapperDbus;
use crate::snapshot::SnapshotSource;

pub fn run_backup(ctx: &CommandContext) -> Result<()> {
    println!("{}", Local::now().format("%d-%m-%Y %H:%M"));
    ctx.instance.run(|| {
        let orchestrator = Orchestrator::new(
            SnapshotSource::new(SnapperDbus::connect()?),
            BindMounter::system(&ctx.config.bind_mount_prefix),
            &ctx.config.archive,
            ctx.run_mode,
        );
        orchestrator.recover();

        let repos = ctx
            .config
            .resolve_repositories(|| orchestrator.source().configs(), &ctx.selected)?;
        if repos.is_empty() {
            println!("no repositories to back up");
            return Ok(());
        }
        for_each_repository(&repos, "backup", |repo| {
            let report = orchestrator.backup(repo)?;
            match &report.archive {
                Some(archive) => println!(
                    "{}: snapshot {} archived as {}",
                    report.repository, report.snapshot, archive.name
                ),
                None => println!(
                    "{}: snapshot {} archived",
                    report.repository, report.snapshot
                ),
            }
            Ok(())
        })
    })?;
    println!("{}", Local::now().format("%d-%m-%Y %H:%M"));
    Ok(())
}
