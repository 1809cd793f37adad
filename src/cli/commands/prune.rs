use chrono::Local;

use crate::cli::commands::{for_each_repository, CommandContext};
use crate::error::Result;
use crate::orchestrator::prune;

pub fn run_prune(ctx: &CommandContext) -> Result<()> {
    println!("{}", Local::now().format("%d-%m-%Y %H:%M"));
    ctx.instance.run(|| {
        let repos = ctx.repositories()?;
        for_each_repository(&repos, "prune", |repo| {
            prune(repo, &ctx.config.archive, ctx.run_mode)?;
            println!("{}: pruned", repo.name());
            Ok(())
        })
    })?;
    println!("{}", Local::now().format("%d-%m-%Y %H:%M"));
    Ok(())
}
