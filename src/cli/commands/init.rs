use crate::archive::ArchiveClient;
use crate::cli::commands::{for_each_repository, CommandContext};
use crate::error::Result;

pub fn run_init(ctx: &CommandContext) -> Result<()> {
    ctx.instance.run(|| {
        let repos = ctx.repositories()?;
        for_each_repository(&repos, "init", |repo| {
            let client = ArchiveClient::new(repo, &ctx.config.archive, ctx.run_mode);
            if client.exists() {
                println!("{}: {} already exists", repo.name(), repo.path().display());
                return Ok(());
            }
            client.init()?;
            println!("{}: initialized {}", repo.name(), repo.path().display());
            Ok(())
        })
    })
}
