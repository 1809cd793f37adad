use crate::archive::ArchiveClient;
use crate::cli::commands::{for_each_repository, CommandContext};
use crate::error::Result;

pub fn run_list(ctx: &CommandContext) -> Result<()> {
    ctx.instance.run(|| {
        let repos = ctx.repositories()?;
        for_each_repository(&repos, "list", |repo| {
            let client = ArchiveClient::new(repo, &ctx.config.archive, ctx.run_mode);
            if !client.exists() {
                println!("{}: no repository at {}", repo.name(), repo.path().display());
                return Ok(());
            }
            let archives = client.list()?;
            println!("{} ({} archives)", repo.name(), archives.len());
            for archive in archives {
                match archive.time {
                    Some(time) => println!("  {}  {}", time.format("%Y-%m-%d %H:%M:%S"), archive.name),
                    None => println!("  {}", archive.name),
                }
            }
            Ok(())
        })
    })
}
