use clap::Subcommand;

use crate::common;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Mark a task completed, count it, and award its RC
    Complete {
        /// Task identifier
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let rt = common::runtime()?;
    rt.block_on(async {
        let session = common::open().await?;
        match action {
            TaskAction::Complete { id } => {
                session.ctx.complete_task(&id).await?;
                let balance = session
                    .ctx
                    .ledger()
                    .balance(session.ctx.user_id())
                    .await?;
                println!("task {id} completed, balance is now {balance}");
            }
        }
        session.persist()?;
        Ok(())
    })
}
