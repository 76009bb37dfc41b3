use clap::Subcommand;

use crate::common;

#[derive(Subcommand)]
pub enum SyncAction {
    /// Print queue status as JSON
    Status,
    /// Replay pending operations now
    Flush,
    /// Drop cached reads
    ClearCache,
    /// List permanently-failed operations
    DeadLetters,
}

pub fn run(action: SyncAction) -> Result<(), Box<dyn std::error::Error>> {
    let rt = common::runtime()?;
    rt.block_on(async {
        let session = common::open().await?;
        let queue = session.ctx.queue();

        match action {
            SyncAction::Status => {
                common::print_json(&queue.status())?;
            }
            SyncAction::Flush => match queue.force_sync().await {
                Some(report) => common::print_json(&report)?,
                None => println!("sync skipped (offline or already in progress)"),
            },
            SyncAction::ClearCache => {
                let removed = queue.clear_cache();
                println!("removed {removed} cached entries");
            }
            SyncAction::DeadLetters => {
                common::print_json(&queue.dead_letters())?;
            }
        }
        session.persist()?;
        Ok(())
    })
}
